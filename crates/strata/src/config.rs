use crate::decode::{self, default_hooks, Hook, KeyMapper};
use crate::provider::{Load, OnStatus};
use crate::subscribe::Subscribers;
use crate::Error;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};
use tree::{merge, Case, Map, Value};

/// Config is a layered configuration registry: providers are loaded in
/// order, later snapshots override earlier ones key by key, and typed
/// reads consult the current merged store.
///
/// Reads (`unmarshal`, `get`, `explain`, `exists`) are safe under
/// concurrent watching. `load` itself must not be called concurrently.
///
/// Config owns locks and an in-flight watch flag, and is intentionally
/// neither `Clone` nor `Copy`; share it behind an `Arc`.
pub struct Config {
    pub(crate) case: Case,
    pub(crate) delimiter: String,
    pub(crate) hooks: Vec<Hook>,
    pub(crate) key_mapper: Option<KeyMapper>,
    pub(crate) on_status: Option<OnStatus>,

    // Lock order: providers before store before subscribers.
    pub(crate) providers: RwLock<Vec<Arc<Provider>>>,
    pub(crate) store: RwLock<Arc<Value>>,
    pub(crate) subscribers: RwLock<Subscribers>,
    pub(crate) watching: AtomicBool,
}

/// One loaded provider: its loader plus its most recent snapshot, held
/// apart from the merged store so provenance survives later merges. The
/// snapshot is atomically replaced by the watch engine.
pub(crate) struct Provider {
    pub loader: Box<dyn Load>,
    pub snapshot: RwLock<Arc<Value>>,
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}

impl Config {
    /// A Config with default options: `.` delimiter, case-insensitive
    /// keys, and the baseline hook chain.
    pub fn new() -> Config {
        Config::builder().build()
    }

    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Load a provider's snapshot and merge it over the store. Later
    /// loads take precedence over earlier ones. On error nothing is
    /// merged and no provider record is kept.
    pub fn load(&self, loader: impl Load) -> Result<(), Error> {
        let raw = loader.load().map_err(|source| Error::Load {
            name: loader.name(),
            source,
        })?;
        let serde_json::Value::Object(fields) = raw else {
            return Err(Error::Load {
                name: loader.name(),
                source: anyhow::anyhow!("provider snapshot must be an object"),
            });
        };
        let snapshot = Map::from_json(fields, self.case);

        if let Some(on_status) = &self.on_status {
            loader.status(on_status.clone());
        }

        let mut providers = self.providers.write().unwrap();
        let merged = {
            let store = self.store.read().unwrap().clone();
            let mut merged = match store.as_object() {
                Some(map) => map.clone(),
                None => Map::new(),
            };
            merge(&mut merged, snapshot.clone());
            Arc::new(Value::Object(merged))
        };
        providers.push(Arc::new(Provider {
            loader: Box::new(loader),
            snapshot: RwLock::new(Arc::new(Value::Object(snapshot))),
        }));
        *self.store.write().unwrap() = merged;
        Ok(())
    }

    /// Decode the value under `path` into `target`. An absent path is a
    /// success that leaves `target` untouched. Decode failures are
    /// reported per leaf, joined, with the target populated best-effort.
    pub fn unmarshal<T>(&self, path: &str, target: &mut T) -> Result<(), Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let store = self.store.read().unwrap().clone();
        let segments = tree::path::split(path, &self.delimiter);
        let Some(node) = tree::path::descend(&store, &segments, self.case) else {
            return Ok(());
        };

        let (decoded, errors) = decode::from_value(node, &self.decode_options());
        if let Some(decoded) = decoded {
            *target = decoded;
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Decode(decode::Errors(errors)))
        }
    }

    /// The value under `path`, or `T::default()` when the path is absent
    /// or fails to decode. Decode failures are logged, not surfaced.
    pub fn get<T>(&self, path: &str) -> T
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let mut target = T::default();
        if let Err(error) = self.unmarshal(path, &mut target) {
            tracing::warn!(path, %error, "failed to decode configuration value");
            return T::default();
        }
        target
    }

    /// Whether the path segments resolve to a value in the merged store.
    /// Providers of defaults use this to avoid shadowing earlier layers.
    pub fn exists(&self, path: &[&str]) -> bool {
        let store = self.store.read().unwrap().clone();
        tree::path::descend(&store, path, self.case).is_some()
    }

    /// Register `callback` to run whenever a change batch alters the
    /// sub-tree under any of `paths`. No paths means every change.
    /// Callbacks must not block.
    pub fn on_change<F>(&self, callback: F, paths: &[&str])
    where
        F: Fn(&Config) + Send + Sync + 'static,
    {
        self.subscribers
            .write()
            .unwrap()
            .register(Arc::new(callback), paths);
    }

    pub(crate) fn decode_options(&self) -> decode::Options {
        decode::Options {
            case: self.case,
            delimiter: self.delimiter.clone(),
            hooks: self.hooks.clone(),
            key_mapper: self.key_mapper.clone(),
        }
    }
}

/// Builder assembles a Config.
pub struct Builder {
    delimiter: String,
    case: Case,
    hooks: Vec<Hook>,
    key_mapper: Option<KeyMapper>,
    on_status: Option<OnStatus>,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder {
            delimiter: ".".to_string(),
            case: Case::Insensitive,
            hooks: default_hooks(),
            key_mapper: None,
            on_status: None,
        }
    }
}

impl Builder {
    /// Path separator. Default `.`.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Builder {
        self.delimiter = delimiter.into();
        self
    }

    /// Compare keys and path segments verbatim instead of case-folded.
    pub fn case_sensitive(mut self) -> Builder {
        self.case = Case::Sensitive;
        self
    }

    /// Append a decode hook to the chain.
    pub fn hook(mut self, hook: Hook) -> Builder {
        self.hooks.push(hook);
        self
    }

    /// Replace the hook chain wholesale.
    pub fn hooks(mut self, hooks: Vec<Hook>) -> Builder {
        self.hooks = hooks;
        self
    }

    /// Transform struct field names before matching them to source keys.
    pub fn key_mapper<F>(mut self, mapper: F) -> Builder
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.key_mapper = Some(Arc::new(mapper));
        self
    }

    /// Observe provider reload attempts. Forwarded to every status-capable
    /// provider as it is loaded.
    pub fn on_status<F>(mut self, on_status: F) -> Builder
    where
        F: Fn(bool, Option<&anyhow::Error>) + Send + Sync + 'static,
    {
        self.on_status = Some(Arc::new(on_status));
        self
    }

    pub fn build(self) -> Config {
        Config {
            case: self.case,
            delimiter: self.delimiter,
            hooks: self.hooks,
            key_mapper: self.key_mapper,
            on_status: self.on_status,
            providers: RwLock::new(Vec::new()),
            store: RwLock::new(Arc::new(Value::Object(Map::new()))),
            subscribers: RwLock::new(Subscribers::default()),
            watching: AtomicBool::new(false),
        }
    }
}
