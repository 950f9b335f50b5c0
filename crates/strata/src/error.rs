use crate::decode;

/// Error is the failure surface of the registry.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A loader failed. Nothing was merged.
    #[error("loading configuration from {name}")]
    Load {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// One or more leaves failed to decode. The target is populated
    /// best-effort.
    #[error(transparent)]
    Decode(#[from] decode::Errors),

    /// A provider's watch failed, cancelling the watch loop.
    #[error("watching configuration from {name}")]
    Watch {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}
