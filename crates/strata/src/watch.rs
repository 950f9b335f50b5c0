use crate::config::{Config, Provider};
use crate::provider::OnChange;
use crate::subscribe::Callback;
use crate::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tree::{compare, merge, Map, Value};

/// Advisory bound on one batch of subscriber callbacks. Overrunning it
/// logs a warning; the batch is not killed.
const DISPATCH_DEADLINE: Duration = Duration::from_secs(60);

impl Config {
    /// Watch every watch-capable provider until `cancel` fires or a
    /// provider fails, rebuilding the merged store on each change and
    /// dispatching the subscribers whose sub-trees actually changed.
    ///
    /// At most one watch runs per Config for its lifetime: later calls
    /// log a warning and return immediately. A Config with no
    /// watch-capable providers also returns immediately.
    pub async fn watch(self: Arc<Self>, cancel: CancellationToken) -> Result<(), Error> {
        if self.watching.swap(true, std::sync::atomic::Ordering::SeqCst) {
            tracing::warn!("configuration watch was already started; ignoring");
            return Ok(());
        }

        let providers: Vec<Arc<Provider>> = self.providers.read().unwrap().clone();
        let watched: Vec<Arc<Provider>> = providers
            .into_iter()
            .filter(|provider| provider.loader.as_watch().is_some())
            .collect();
        if watched.is_empty() {
            tracing::debug!("no provider supports watching");
            return Ok(());
        }

        // Change notifications coalesce through a capacity-one wake
        // channel: the coordinator re-merges every provider snapshot per
        // wake-up, so a full channel already implies a pending rebuild.
        let (wake_tx, mut wake_rx) = mpsc::channel::<()>(1);

        let mut tasks = tokio::task::JoinSet::new();
        for provider in watched {
            let cancel = cancel.clone();
            let wake_tx = wake_tx.clone();
            let case = self.case;

            tasks.spawn(async move {
                let name = provider.loader.name();
                let record = provider.clone();
                let on_change: OnChange = Box::new(move |raw| {
                    let serde_json::Value::Object(fields) = raw else {
                        tracing::warn!(
                            provider = %record.loader.name(),
                            "ignoring a non-object snapshot"
                        );
                        return;
                    };
                    let snapshot = Arc::new(Value::Object(Map::from_json(fields, case)));
                    *record.snapshot.write().unwrap() = snapshot;
                    let _ = wake_tx.try_send(());
                });

                let watcher = provider
                    .loader
                    .as_watch()
                    .expect("provider supports watching");
                tokio::select! {
                    _ = cancel.cancelled() => Ok(()),
                    result = watcher.watch(on_change) => {
                        result.map_err(|source| Error::Watch { name, source })
                    }
                }
            });
        }
        // Keep one sender alive so the wake channel never reports closed.
        let _wake_tx = wake_tx;

        let mut first_error: Option<Error> = None;
        let mut old_store = self.store.read().unwrap().clone();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(Ok(()))) => (),
                    Some(Ok(Err(error))) => {
                        // The first failing provider cancels the watch.
                        tracing::error!(%error, "provider watch failed; cancelling");
                        first_error.get_or_insert(error);
                        cancel.cancel();
                    }
                    Some(Err(join_error)) if join_error.is_panic() => {
                        std::panic::resume_unwind(join_error.into_panic());
                    }
                    Some(Err(_)) => (),
                },
                Some(()) = wake_rx.recv() => {
                    old_store = apply_change(&self, old_store).await;
                }
            }
        }

        // Every provider task observes cancellation before watch returns.
        while let Some(joined) = tasks.join_next().await {
            if let Ok(Err(error)) = joined {
                first_error.get_or_insert(error);
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

// One change batch: rebuild the merged store from every provider
// snapshot in insertion order, install it, and dispatch the subscribers
// whose registered sub-tree differs between the old and new stores.
async fn apply_change(config: &Arc<Config>, old_store: Arc<Value>) -> Arc<Value> {
    let providers: Vec<Arc<Provider>> = config.providers.read().unwrap().clone();

    let mut merged = Map::new();
    for provider in &providers {
        let snapshot = provider.snapshot.read().unwrap().clone();
        if let Some(fields) = snapshot.as_object() {
            merge(&mut merged, fields.clone());
        }
    }
    let new_store = Arc::new(Value::Object(merged));
    *config.store.write().unwrap() = new_store.clone();

    // Subscribers are captured at the moment the change is processed.
    let subscribers = config.subscribers.read().unwrap().snapshot();
    let mut batch: Vec<Callback> = Vec::new();
    for (path, callbacks) in subscribers {
        let segments = tree::path::split(&path, &config.delimiter);
        let old_node = tree::path::descend(&old_store, &segments, config.case);
        let new_node = tree::path::descend(&new_store, &segments, config.case);

        let changed = match (old_node, new_node) {
            (None, None) => false,
            (Some(old), Some(new)) => compare(old, new) != std::cmp::Ordering::Equal,
            _ => true,
        };
        if changed {
            batch.extend(callbacks);
        }
    }

    if !batch.is_empty() {
        let mut handle = {
            let config = config.clone();
            tokio::task::spawn_blocking(move || {
                for callback in batch {
                    callback(config.as_ref());
                }
            })
        };
        tokio::select! {
            joined = &mut handle => {
                if let Err(join_error) = joined {
                    if join_error.is_panic() {
                        std::panic::resume_unwind(join_error.into_panic());
                    }
                }
            }
            _ = tokio::time::sleep(DISPATCH_DEADLINE) => {
                tracing::warn!(
                    "subscriber callbacks exceeded the dispatch deadline; \
                     callbacks must not block"
                );
            }
        }
    }
    new_store
}
