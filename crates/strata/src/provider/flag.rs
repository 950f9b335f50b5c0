use super::{insert_nested, Load};
use clap::parser::ValueSource;
use std::sync::Arc;

/// Probes whether a path is already defined by earlier providers. Flag
/// values that merely restate a clap default must not shadow them.
pub type Exists = Arc<dyn Fn(&[&str]) -> bool + Send + Sync>;

/// Flag snapshots parsed command-line matches. Argument ids split on the
/// delimiter into nested keys, so an argument named `server.host`
/// contributes under `{server: {host: ...}}`.
pub struct Flag {
    matches: clap::ArgMatches,
    delimiter: String,
    exists: Option<Exists>,
}

impl Flag {
    pub fn new(matches: clap::ArgMatches) -> Flag {
        Flag {
            matches,
            delimiter: ".".to_string(),
            exists: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Flag {
        self.delimiter = delimiter.into();
        self
    }

    /// Install the probe deciding whether a default-valued flag should
    /// contribute. Typically `{config.exists}` of the owning registry.
    pub fn with_exists(mut self, exists: Exists) -> Flag {
        self.exists = Some(exists);
        self
    }
}

impl Load for Flag {
    fn name(&self) -> String {
        "flag".to_string()
    }

    fn load(&self) -> anyhow::Result<serde_json::Value> {
        let mut root = serde_json::Map::new();

        for id in self.matches.ids() {
            // Groups and value-less flags have no raw values to offer.
            let Ok(Some(raw)) = self.matches.try_get_raw(id.as_str()) else {
                continue;
            };
            let keys: Vec<&str> = id.as_str().split(&self.delimiter).collect();

            if self.matches.value_source(id.as_str()) == Some(ValueSource::DefaultValue) {
                if let Some(exists) = &self.exists {
                    if exists(&keys) {
                        continue;
                    }
                }
            }

            let mut values: Vec<serde_json::Value> = raw
                .map(|value| serde_json::Value::String(value.to_string_lossy().into_owned()))
                .collect();
            let value = match values.len() {
                0 => continue,
                1 => values.remove(0),
                _ => serde_json::Value::Array(values),
            };
            insert_nested(&mut root, &keys, value);
        }
        Ok(serde_json::Value::Object(root))
    }
}
