use super::{insert_nested, Load};

/// Env snapshots the process environment. `DATABASE_URL=...` becomes
/// `{database: {url: "..."}}`: names are lowercased and split on `_`.
#[derive(Debug, Default)]
pub struct Env {
    prefix: Option<String>,
}

impl Env {
    pub fn new() -> Env {
        Env::default()
    }

    /// Only snapshot variables whose name starts with `prefix`.
    /// The prefix is retained in the produced keys.
    pub fn with_prefix(prefix: impl Into<String>) -> Env {
        Env {
            prefix: Some(prefix.into()),
        }
    }
}

impl Load for Env {
    fn name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("env:{prefix}"),
            None => "env".to_string(),
        }
    }

    fn load(&self) -> anyhow::Result<serde_json::Value> {
        let mut root = serde_json::Map::new();

        for (name, value) in std::env::vars() {
            if let Some(prefix) = &self.prefix {
                if !name.starts_with(prefix) {
                    continue;
                }
            }
            let name = name.to_lowercase();
            let keys: Vec<&str> = name.split('_').filter(|key| !key.is_empty()).collect();
            if keys.is_empty() {
                continue;
            }
            insert_nested(&mut root, &keys, serde_json::Value::String(value));
        }
        Ok(serde_json::Value::Object(root))
    }
}

#[cfg(test)]
mod test {
    use super::Env;
    use crate::provider::Load;

    #[test]
    fn test_env_snapshot() {
        // Process-global state; pick names unlikely to collide.
        std::env::set_var("STRATA_TEST_SERVER_HOST", "example.com");
        std::env::set_var("STRATA_TEST_SERVER_PORT", "8080");

        let snapshot = Env::with_prefix("STRATA_TEST_").load().unwrap();
        let server = &snapshot["strata"]["test"]["server"];

        assert_eq!(server["host"], "example.com");
        assert_eq!(server["port"], "8080");

        std::env::remove_var("STRATA_TEST_SERVER_HOST");
        std::env::remove_var("STRATA_TEST_SERVER_PORT");
    }

    #[test]
    fn test_env_name() {
        assert_eq!(Env::new().name(), "env");
        assert_eq!(Env::with_prefix("APP_").name(), "env:APP_");
    }
}
