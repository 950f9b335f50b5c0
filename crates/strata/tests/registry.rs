use serde_json::json;
use std::sync::Arc;

struct Mock {
    name: &'static str,
    snapshot: serde_json::Value,
}

impl strata::provider::Load for Mock {
    fn name(&self) -> String {
        self.name.to_string()
    }
    fn load(&self) -> anyhow::Result<serde_json::Value> {
        Ok(self.snapshot.clone())
    }
}

fn load(config: &strata::Config, name: &'static str, snapshot: serde_json::Value) {
    config.load(Mock { name, snapshot }).unwrap();
}

#[test]
fn test_layered_override_and_provenance() {
    let config = strata::Config::new();
    load(&config, "first", json!({"k": "a"}));
    load(&config, "second", json!({"k": "b"}));

    assert_eq!(config.get::<String>("k"), "b");

    let explained = config.explain("k");
    let second = explained.find("second").unwrap();
    let first = explained.find("first").unwrap();
    assert!(second < first, "{explained}");
}

#[test]
fn test_scalar_conflicts_recursively_merge() {
    let config = strata::Config::new();
    load(
        &config,
        "first",
        json!({"server": {"host": "a.example.com", "port": 1}}),
    );
    load(&config, "second", json!({"server": {"port": 2}}));

    // The mapping merges; only the conflicting scalar is overridden.
    assert_eq!(config.get::<String>("server.host"), "a.example.com");
    assert_eq!(config.get::<u16>("server.port"), 2);
}

#[test]
fn test_case_insensitive_lookup() {
    let config = strata::Config::new();
    load(&config, "mock", json!({"Server": {"Host": "example.com"}}));

    let mut host = String::new();
    config.unmarshal("server.host", &mut host).unwrap();
    assert_eq!(host, "example.com");
}

#[test]
fn test_weak_typing() {
    let config = strata::Config::new();
    load(&config, "mock", json!({"port": "8080"}));

    let mut port: i16 = 0;
    config.unmarshal("port", &mut port).unwrap();
    assert_eq!(port, 8080);
}

#[test]
fn test_typed_struct_reads_with_duration_hook() {
    let config = strata::Config::new();
    load(
        &config,
        "mock",
        json!({
            "server": {
                "Host": "example.com",
                "port": "8080",
                "timeout": "2s",
                "tags": "a,b",
            }
        }),
    );

    #[derive(serde::Deserialize, Debug, Default, PartialEq)]
    #[serde(default)]
    struct Server {
        host: String,
        port: u16,
        timeout: Option<std::time::Duration>,
        tags: Vec<String>,
    }

    let server: Server = config.get("server");
    assert_eq!(
        server,
        Server {
            host: "example.com".to_string(),
            port: 8080,
            timeout: Some(std::time::Duration::from_secs(2)),
            tags: vec!["a".to_string(), "b".to_string()],
        }
    );
}

#[test]
fn test_explain_blurring() {
    let config = strata::Config::new();
    load(&config, "mock", json!({"db": {"password": "hunter2"}}));

    let explained = config.explain("db.password");
    assert!(explained.contains("******"), "{explained}");
    assert!(!explained.contains("hunter2"), "{explained}");
}

#[test]
fn test_decoder_error_aggregation() {
    let config = strata::Config::new();
    load(&config, "mock", json!({"a": -1, "b": -2}));

    #[derive(serde::Deserialize, Debug, Default)]
    #[serde(default)]
    struct Counts {
        a: u32,
        b: u32,
    }

    let mut counts = Counts::default();
    let rendered = config.unmarshal("", &mut counts).unwrap_err().to_string();

    assert!(rendered.contains("'a'"), "{rendered}");
    assert!(rendered.contains("'b'"), "{rendered}");
}

#[test]
fn test_flag_defaults_defer_to_earlier_providers() {
    let config = Arc::new(strata::Config::new());
    load(&config, "file", json!({"server": {"port": 9000}}));

    let matches = clap::Command::new("app")
        .arg(clap::Arg::new("server.host").long("host").default_value("localhost"))
        .arg(clap::Arg::new("server.port").long("port").default_value("8080"))
        .get_matches_from(["app"]);

    let exists: strata::provider::Exists = {
        let config = config.clone();
        Arc::new(move |path: &[&str]| config.exists(path))
    };
    config
        .load(strata::provider::Flag::new(matches).with_exists(exists))
        .unwrap();

    // The defaulted port defers to the earlier provider; the defaulted
    // host fills its vacant path.
    assert_eq!(config.get::<u16>("server.port"), 9000);
    assert_eq!(config.get::<String>("server.host"), "localhost");
}

#[test]
fn test_custom_delimiter() {
    let config = strata::Config::builder().delimiter("/").build();
    load(&config, "mock", json!({"a": {"b": 1}}));

    assert_eq!(config.get::<u8>("a/b"), 1);
    assert_eq!(config.get::<u8>("a.b"), 0);
}
