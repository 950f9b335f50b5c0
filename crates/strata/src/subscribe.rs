use std::collections::BTreeMap;
use std::sync::Arc;

/// A change callback. Invoked once per change batch that alters the
/// sub-tree under a registered path. Contractually non-blocking.
pub type Callback = Arc<dyn Fn(&crate::Config) + Send + Sync>;

/// Path-keyed callback registry. The empty path subscribes to any change.
#[derive(Default)]
pub(crate) struct Subscribers {
    by_path: BTreeMap<String, Vec<Callback>>,
}

impl Subscribers {
    /// Register `callback` under each of `paths`, normalizing an empty
    /// set to the any-change entry.
    pub fn register(&mut self, callback: Callback, paths: &[&str]) {
        if paths.is_empty() {
            self.by_path
                .entry(String::new())
                .or_default()
                .push(callback);
            return;
        }
        for path in paths {
            self.by_path
                .entry((*path).to_string())
                .or_default()
                .push(callback.clone());
        }
    }

    /// Snapshot every (path, callbacks) pair. Dispatch works against this
    /// snapshot, not against later registrations.
    pub fn snapshot(&self) -> Vec<(String, Vec<Callback>)> {
        self.by_path
            .iter()
            .map(|(path, callbacks)| (path.clone(), callbacks.clone()))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::Subscribers;
    use std::sync::Arc;

    #[test]
    fn test_empty_paths_normalize() {
        let mut subscribers = Subscribers::default();
        subscribers.register(Arc::new(|_| ()), &[]);
        subscribers.register(Arc::new(|_| ()), &["a", "b"]);

        let snapshot = subscribers.snapshot();
        let paths: Vec<_> = snapshot.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["", "a", "b"]);
    }
}
