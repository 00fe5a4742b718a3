//! Process-scoped cache for the enriched dataset.
//!
//! The upstream datasets refresh monthly, so the enriched dataset is
//! built once and served from memory until its TTL lapses, at which
//! point callers rebuild it wholesale and [`DatasetStore::put`] swaps it
//! in. Readers only ever see a complete dataset; there is no
//! incremental invalidation.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::Dataset;

/// Default dataset lifetime, just over one month. Matches the upstream
/// refresh cadence of the resale datasets.
pub const DATASET_TTL: Duration = Duration::from_secs(2_630_000);

struct CachedDataset {
    dataset: Arc<Dataset>,
    built_at: Instant,
}

/// Holder for the current enriched dataset.
///
/// Built once per process and injected into whatever serves the
/// presentation layer; tests substitute fixture datasets through the
/// same interface.
pub struct DatasetStore {
    ttl: Duration,
    inner: RwLock<Option<CachedDataset>>,
}

impl DatasetStore {
    /// Creates an empty store whose datasets expire after `ttl`.
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: RwLock::new(None),
        }
    }

    /// Creates an empty store with the monthly [`DATASET_TTL`].
    #[must_use]
    pub const fn with_default_ttl() -> Self {
        Self::new(DATASET_TTL)
    }

    /// Returns the current dataset, or `None` when the store is empty
    /// or the dataset has outlived its TTL and needs a rebuild.
    #[must_use]
    pub fn get(&self) -> Option<Arc<Dataset>> {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        guard.as_ref().and_then(|cached| {
            if cached.built_at.elapsed() < self.ttl {
                Some(Arc::clone(&cached.dataset))
            } else {
                None
            }
        })
    }

    /// Installs a freshly built dataset, replacing any previous one,
    /// and returns the shared handle.
    pub fn put(&self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        log::info!(
            "Installing dataset with {} transactions",
            dataset.transactions.len()
        );
        *guard = Some(CachedDataset {
            dataset: Arc::clone(&dataset),
            built_at: Instant::now(),
        });
        dataset
    }
}
