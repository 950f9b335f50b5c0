use crate::config::{Config, Provider};
use std::fmt::Write;
use std::sync::Arc;
use tree::{redact, Value};

impl Config {
    /// Explain reports, for each leaf under `path`, which provider
    /// supplied the winning value and which providers are shadowed,
    /// most-recently-loaded first. Values pass through the credential
    /// blurrer before rendering.
    pub fn explain(&self, path: &str) -> String {
        let store = self.store.read().unwrap().clone();
        let segments = tree::path::split(path, &self.delimiter);
        let Some(node) = tree::path::descend(&store, &segments, self.case) else {
            return format!("{path} has no configuration.\n");
        };

        let providers: Vec<Arc<Provider>> = self.providers.read().unwrap().clone();
        let mut out = String::new();
        self.explain_node(&mut out, path, node, &providers);
        out
    }

    fn explain_node(
        &self,
        out: &mut String,
        path: &str,
        node: &Value,
        providers: &[Arc<Provider>],
    ) {
        // A mapping explains as one block per leaf beneath it.
        if let Value::Object(map) = node {
            for (_, entry) in map.iter() {
                let child = if path.is_empty() {
                    entry.spelling.clone()
                } else {
                    format!("{}{}{}", path, self.delimiter, entry.spelling)
                };
                self.explain_node(out, &child, &entry.value, providers);
            }
            return;
        }

        let segments = tree::path::split(path, &self.delimiter);
        let mut layers: Vec<(String, String)> = Vec::new();
        for provider in providers.iter().rev() {
            let snapshot = provider.snapshot.read().unwrap().clone();
            if let Some(value) = tree::path::descend(&snapshot, &segments, self.case) {
                layers.push((redact::blur(path, value), provider.loader.name()));
            }
        }

        let Some((value, loader)) = layers.first() else {
            let _ = writeln!(out, "{path} has no configuration.");
            return;
        };
        let _ = writeln!(
            out,
            "{path} has value[{value}] that is loaded by loader[{loader}]."
        );
        if layers.len() > 1 {
            let _ = writeln!(out, "Here are other value(loader)s:");
            for (value, loader) in &layers[1..] {
                let _ = writeln!(out, "  - {value}({loader})");
            }
        }
    }
}
