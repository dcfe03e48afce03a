use std::collections::HashMap;
use std::sync::Arc;

use freshdeps_core::PackageMetadata;
use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::client::RegistryApi;
use crate::error::RegistryError;
use crate::throttle::Throttler;

pub type FetchOutcome = Result<Arc<PackageMetadata>, RegistryError>;

/// Per-run memo of registry lookups. The first request for a name registers
/// an entry before the fetch starts; later requests for the same name await
/// that entry instead of issuing another fetch. Failures are cached too and
/// never retried.
pub struct MetadataCache {
    registry: Arc<dyn RegistryApi>,
    throttler: Arc<Throttler>,
    entries: Mutex<HashMap<String, Arc<OnceCell<FetchOutcome>>>>,
}

impl MetadataCache {
    pub fn new(registry: Arc<dyn RegistryApi>, throttler: Arc<Throttler>) -> Self {
        Self {
            registry,
            throttler,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn throttler(&self) -> &Throttler {
        &self.throttler
    }

    /// Metadata for `name`, or `None` when the lookup failed.
    pub async fn get_or_fetch(&self, name: &str) -> Option<Arc<PackageMetadata>> {
        self.fetch_outcome(name).await.ok()
    }

    pub async fn fetch_outcome(&self, name: &str) -> FetchOutcome {
        let entry = {
            let mut entries = self.entries.lock();
            match entries.get(name) {
                Some(entry) => {
                    log::debug!("metadata cache hit for {name}");
                    Arc::clone(entry)
                }
                None => {
                    log::debug!("metadata cache miss for {name}");
                    let entry = Arc::new(OnceCell::new());
                    entries.insert(name.to_string(), Arc::clone(&entry));
                    entry
                }
            }
        };

        entry
            .get_or_init(|| async {
                let outcome = self
                    .throttler
                    .submit(|| self.registry.package_metadata(name))
                    .await;
                if let Err(err) = &outcome {
                    log::warn!("{err}");
                }
                outcome.map(Arc::new)
            })
            .await
            .clone()
    }

    /// Number of distinct package names requested so far.
    pub fn requested(&self) -> usize {
        self.entries.lock().len()
    }

    /// Names whose lookup settled with an error, sorted.
    pub fn failures(&self) -> Vec<(String, RegistryError)> {
        let entries = self.entries.lock();
        let mut failures = entries
            .iter()
            .filter_map(|(name, entry)| match entry.get() {
                Some(Err(err)) => Some((name.clone(), err.clone())),
                _ => None,
            })
            .collect::<Vec<_>>();
        failures.sort_by(|a, b| a.0.cmp(&b.0));
        failures
    }
}
