//! In-memory caches
//!
//! Every namespace is its own [`TtlCache`] instance so TTLs and capacities can
//! differ. [`Caches`] bundles the namespaces the pipeline uses; it is owned by
//! the resolver and rebuilt on restart.

pub mod ttl;

pub use ttl::TtlCache;

use crate::config::CacheSettings;
use crate::resolver::{EpisodeRecord, ResolvedStream};
use std::sync::Arc;

/// All cache namespaces used by the pipeline
#[derive(Debug)]
pub struct Caches {
    /// Rendered markup keyed by normalized URL
    pub pages: Arc<TtlCache<String, String>>,
    /// Finalized episode lists keyed by series id
    pub episodes: Arc<TtlCache<String, Arc<Vec<EpisodeRecord>>>>,
    /// Resolved stream URLs keyed by content slug
    pub streams: Arc<TtlCache<String, ResolvedStream>>,
    /// Filtered manifests keyed by upstream host and path
    pub manifests: Arc<TtlCache<String, String>>,
}

impl Caches {
    pub fn new(settings: &CacheSettings) -> Self {
        let scrape_ttl = settings.scrape_ttl();
        Self {
            pages: Arc::new(TtlCache::new("pages", scrape_ttl, settings.max_entries)),
            episodes: Arc::new(TtlCache::new("episodes", scrape_ttl, settings.max_entries)),
            streams: Arc::new(TtlCache::new("streams", scrape_ttl, settings.max_entries)),
            manifests: Arc::new(TtlCache::new(
                "manifests",
                settings.manifest_ttl(),
                settings.manifest_max_entries,
            )),
        }
    }

    /// Clear every namespace
    pub async fn invalidate_all(&self) {
        self.pages.clear().await;
        self.episodes.clear().await;
        self.streams.clear().await;
        self.manifests.clear().await;
        tracing::info!("All caches invalidated");
    }

    /// Entry counts per namespace
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            pages: self.pages.len().await,
            episodes: self.episodes.len().await,
            streams: self.streams.len().await,
            manifests: self.manifests.len().await,
        }
    }
}

/// Entry counts per cache namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub pages: usize,
    pub episodes: usize,
    pub streams: usize,
    pub manifests: usize,
}
