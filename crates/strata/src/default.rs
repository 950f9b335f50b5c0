use crate::provider::Env;
use crate::{Config, Error};
use std::sync::{Arc, RwLock};

lazy_static::lazy_static! {
    static ref DEFAULT: RwLock<Arc<Config>> = RwLock::new(Arc::new(env_config()));
}

// The zero-configuration default: environment variables only.
fn env_config() -> Config {
    let config = Config::new();
    if let Err(error) = config.load(Env::new()) {
        tracing::warn!(%error, "failed to load the environment into the default Config");
    }
    config
}

/// Replace the process-wide default Config used by the top-level
/// [`get`], [`unmarshal`], [`on_change`], and [`explain`].
pub fn set_default(config: Arc<Config>) {
    *DEFAULT.write().unwrap() = config;
}

/// The process-wide default Config. Before any [`set_default`] it holds
/// an environment-variable provider, so zero-configuration reads work.
pub fn default_config() -> Arc<Config> {
    DEFAULT.read().unwrap().clone()
}

/// [`Config::get`] against the default Config.
pub fn get<T>(path: &str) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    default_config().get(path)
}

/// [`Config::unmarshal`] against the default Config.
pub fn unmarshal<T>(path: &str, target: &mut T) -> Result<(), Error>
where
    T: serde::de::DeserializeOwned,
{
    default_config().unmarshal(path, target)
}

/// [`Config::on_change`] against the default Config.
pub fn on_change<F>(callback: F, paths: &[&str])
where
    F: Fn(&Config) + Send + Sync + 'static,
{
    default_config().on_change(callback, paths)
}

/// [`Config::explain`] against the default Config.
pub fn explain(path: &str) -> String {
    default_config().explain(path)
}
