//! A layered configuration registry. Providers contribute snapshots in
//! load order, later layers override earlier ones key by key, and
//! applications read typed values from the merged result:
//!
//! ```no_run
//! # fn main() -> Result<(), strata::Error> {
//! let config = strata::Config::new();
//! config.load(strata::provider::File::new("app.yaml").ignore_missing())?;
//! config.load(strata::provider::Env::new())?;
//!
//! let port: u16 = config.get("server.port");
//! # Ok(())
//! # }
//! ```
//!
//! Watch-capable providers push full new snapshots; `Config::watch`
//! re-merges the store on each change and notifies the subscribers whose
//! registered sub-trees actually changed. `Config::explain` reconstructs,
//! per path, which provider supplied the winning value and which were
//! shadowed, with credentials blurred.

mod config;
pub use config::{Builder, Config};

pub mod decode;
pub use decode::{Hook, Kind};

mod default;
pub use default::{default_config, explain, get, on_change, set_default, unmarshal};

mod error;
pub use error::Error;

mod explain;

pub mod provider;

mod subscribe;
pub use subscribe::Callback;

mod watch;

pub use tree::{Case, Map, Value};
