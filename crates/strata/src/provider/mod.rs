//! Provider contracts, and the built-in providers the registry ships
//! with. A provider is anything implementing [`Load`]; watching and
//! status reporting are optional capabilities discovered through it.

use async_trait::async_trait;

mod env;
pub use env::Env;
mod file;
pub use file::File;
mod flag;
pub use flag::{Exists, Flag};

/// Delivers a full new snapshot (never a diff) from a watching provider.
pub type OnChange = Box<dyn Fn(serde_json::Value) + Send + Sync>;

/// Observes each internal reload attempt of a polling provider with
/// whether content changed and any error. Observability only.
pub type OnStatus = std::sync::Arc<dyn Fn(bool, Option<&anyhow::Error>) + Send + Sync>;

/// Load produces a provider's full configuration snapshot: a JSON object
/// whose leaves are scalars, arrays, or further objects. The registry
/// snapshots the returned value, so idempotency is not required.
pub trait Load: Send + Sync + 'static {
    /// Identity used in provenance output and errors.
    fn name(&self) -> String;

    fn load(&self) -> anyhow::Result<serde_json::Value>;

    /// The watch capability, if the provider can push changes.
    fn as_watch(&self) -> Option<&dyn Watch> {
        None
    }

    /// Register a status observer. Providers without internal reload
    /// attempts ignore it.
    fn status(&self, on_status: OnStatus) {
        let _ = on_status;
    }
}

/// Watch blocks until cancelled (the engine races it against a shared
/// cancellation token) or until an unrecoverable error, invoking
/// `on_change` with the full new mapping whenever the provider detects a
/// change. A provider must not invoke `on_change` concurrently with
/// itself.
#[async_trait]
pub trait Watch: Send + Sync {
    async fn watch(&self, on_change: OnChange) -> anyhow::Result<()>;
}

/// An infrastructure event payload that no handler recognized.
#[derive(thiserror::Error, Debug)]
#[error("unsupported event: {0}")]
pub struct UnsupportedEvent(pub String);

/// OnEvent lets external dispatch (a pub/sub fan-out, for instance) hand
/// infrastructure events to a push-driven provider. Returns whether the
/// event indicates a content change the provider will reload for.
pub trait OnEvent {
    fn on_event(&self, payload: &[u8]) -> Result<bool, UnsupportedEvent>;
}

// Insert `value` at the nested key path, creating intermediate objects
// and replacing any scalar found along the way.
pub(crate) fn insert_nested(
    root: &mut serde_json::Map<String, serde_json::Value>,
    keys: &[&str],
    value: serde_json::Value,
) {
    let Some((last, parents)) = keys.split_last() else {
        return;
    };
    let mut node = root;

    for key in parents {
        let slot = node
            .entry(key.to_string())
            .or_insert(serde_json::Value::Null);
        if !slot.is_object() {
            *slot = serde_json::Value::Object(serde_json::Map::new());
        }
        match slot {
            serde_json::Value::Object(next) => node = next,
            _ => unreachable!("slot was just made an object"),
        }
    }
    node.insert((*last).to_string(), value);
}

#[cfg(test)]
mod test {
    use super::insert_nested;
    use serde_json::json;

    #[test]
    fn test_insert_nested() {
        let mut root = serde_json::Map::new();
        insert_nested(&mut root, &["a", "b"], json!("1"));
        insert_nested(&mut root, &["a", "c"], json!("2"));
        insert_nested(&mut root, &["d"], json!("3"));

        assert_eq!(
            serde_json::Value::Object(root),
            json!({"a": {"b": "1", "c": "2"}, "d": "3"}),
        );
    }

    #[test]
    fn test_insert_nested_replaces_scalars() {
        let mut root = serde_json::Map::new();
        insert_nested(&mut root, &["a"], json!("1"));
        insert_nested(&mut root, &["a", "b"], json!("2"));

        assert_eq!(serde_json::Value::Object(root), json!({"a": {"b": "2"}}));
    }
}
