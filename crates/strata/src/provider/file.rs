use super::Load;
use anyhow::Context;
use std::path::PathBuf;

/// File loads one configuration file, parsed as YAML for `.yaml`/`.yml`
/// extensions and as JSON otherwise.
#[derive(Debug)]
pub struct File {
    path: PathBuf,
    ignore_missing: bool,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> File {
        File {
            path: path.into(),
            ignore_missing: false,
        }
    }

    /// A missing file contributes an empty snapshot instead of failing.
    pub fn ignore_missing(mut self) -> File {
        self.ignore_missing = true;
        self
    }
}

impl Load for File {
    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn load(&self) -> anyhow::Result<serde_json::Value> {
        let bytes = match std::fs::read(&self.path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && self.ignore_missing => {
                return Ok(serde_json::Value::Object(serde_json::Map::new()));
            }
            result => result.with_context(|| format!("reading {}", self.path.display()))?,
        };

        let is_yaml = matches!(
            self.path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let parsed = if is_yaml {
            serde_yaml::from_slice(&bytes)
                .with_context(|| format!("parsing YAML from {}", self.path.display()))?
        } else {
            serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing JSON from {}", self.path.display()))?
        };
        Ok(parsed)
    }
}
