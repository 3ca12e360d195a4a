//! Content resolution
//!
//! [`ContentResolver`] owns the automation pool, the caches, the slug index and
//! the individual resolvers, and is the entry point used by the HTTP server and
//! the CLI.

pub mod episodes;
pub mod network;
pub mod slug_index;
pub mod strategies;
pub mod stream;

pub use episodes::EpisodeListResolver;
pub use slug_index::SlugIndex;
pub use stream::StreamResolver;

use crate::browser::{Automation, ChallengeDetector, ChromeAutomation, PageFetcher};
use crate::cache::{CacheStats, Caches};
use crate::catalog::SeriesDescriptor;
use crate::config::Settings;
use crate::manifest::{ContentKind, LanguagePolicy, ManifestProxy};
use crate::pool::ResourcePool;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One finalized episode of a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub number: u32,
    pub title: String,
    pub thumbnail: Option<String>,
    pub source_slug: String,
}

/// How a media URL is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    SegmentedPlaylist,
    SingleFile,
}

/// Where a stream URL was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStrategy {
    Network,
    MediaElement,
    Iframe,
    ScriptPlaylist,
    ScriptFile,
    DataAttribute,
    Keyword,
}

/// A media URL found for a content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCandidate {
    pub url: String,
    pub kind: TransportKind,
    pub strategy: DiscoveryStrategy,
}

/// The candidate chosen for a content item
pub type ResolvedStream = StreamCandidate;

/// Outcome of a stream resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamResolution {
    Found(ResolvedStream),
    NotFound,
    Blocked,
}

impl StreamResolution {
    pub fn found(&self) -> Option<&ResolvedStream> {
        match self {
            StreamResolution::Found(stream) => Some(stream),
            _ => None,
        }
    }

    /// Short machine-readable status
    pub fn status(&self) -> &'static str {
        match self {
            StreamResolution::Found(_) => "found",
            StreamResolution::NotFound => "not_found",
            StreamResolution::Blocked => "blocked",
        }
    }
}

/// Pool, caches and index counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub caches: CacheStats,
    pub pool_capacity: usize,
    pub pool_in_use: usize,
    pub pool_waiting: usize,
    pub indexed_slugs: usize,
}

/// Facade over the whole resolution pipeline
#[derive(Debug)]
pub struct ContentResolver {
    settings: Settings,
    pool: Arc<ResourcePool>,
    caches: Caches,
    slugs: Arc<SlugIndex>,
    episodes: EpisodeListResolver,
    streams: StreamResolver,
    manifests: ManifestProxy,
}

impl ContentResolver {
    /// Resolver driving a local Chromium. The browser is launched on first use.
    pub fn new(settings: Settings) -> Result<Self> {
        let automation = Arc::new(ChromeAutomation::new(settings.browser.clone()));
        Self::with_automation(settings, automation)
    }

    /// Resolver driving the given automation backend
    pub fn with_automation(settings: Settings, automation: Arc<dyn Automation>) -> Result<Self> {
        let pool = Arc::new(ResourcePool::new(settings.browser.pool_size));
        let caches = Caches::new(&settings.cache);
        let slugs = Arc::new(SlugIndex::new());
        let detector = ChallengeDetector::new(settings.site.challenge_markers.clone());

        let fetcher = Arc::new(PageFetcher::new(
            automation.clone(),
            pool.clone(),
            caches.pages.clone(),
            detector.clone(),
            settings.browser.clone(),
        ));
        let episodes = EpisodeListResolver::new(
            fetcher,
            caches.episodes.clone(),
            slugs.clone(),
            settings.site.clone(),
        )?;
        let streams = StreamResolver::new(
            automation,
            pool.clone(),
            caches.streams.clone(),
            detector,
            &settings.site,
            settings.browser.clone(),
        )?;
        let manifests = ManifestProxy::new(caches.manifests.clone(), settings.manifest.clone())?;

        tracing::info!(
            pool_size = pool.capacity(),
            base_url = %settings.site.base_url,
            "Content resolver ready"
        );

        Ok(Self {
            settings,
            pool,
            caches,
            slugs,
            episodes,
            streams,
            manifests,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Canonical episode list of a series; empty when the listing cannot be
    /// read
    pub async fn resolve_episodes(&self, series: &SeriesDescriptor) -> Arc<Vec<EpisodeRecord>> {
        self.episodes.resolve(series).await
    }

    /// Direct media URL for a content slug
    pub async fn resolve_stream_url(&self, slug: &str) -> StreamResolution {
        self.streams.resolve(slug).await
    }

    /// Stream for an episode addressed by catalog coordinates. The episode
    /// list is resolved first when the slug is not yet indexed.
    pub async fn resolve_episode_stream(
        &self,
        series: &SeriesDescriptor,
        season: u32,
        episode: u32,
    ) -> StreamResolution {
        let mut slug = self.slugs.lookup(&series.id, season, episode).await;
        if slug.is_none() {
            self.resolve_episodes(series).await;
            slug = self.slugs.lookup(&series.id, season, episode).await;
        }

        match slug {
            Some(slug) => self.resolve_stream_url(&slug).await,
            None => {
                tracing::info!(
                    key = %series.id,
                    season,
                    episode,
                    phase = "index",
                    "No slug known for episode"
                );
                StreamResolution::NotFound
            }
        }
    }

    /// Rewrite an already fetched master playlist
    pub fn filter_manifest(&self, raw: &str, base_url: &str, kind: ContentKind) -> Result<String> {
        let base = url::Url::parse(base_url)?;
        let policy = LanguagePolicy::for_kind(&self.settings.manifest, kind);
        Ok(crate::manifest::filter(raw, &base, &policy))
    }

    /// Fetch, rewrite and cache an upstream master playlist
    pub async fn fetch_filtered_manifest(&self, upstream_url: &str, kind: ContentKind) -> Result<String> {
        self.manifests.fetch_filtered(upstream_url, kind).await
    }

    /// Drop every cached value and the slug index
    pub async fn invalidate_caches(&self) {
        self.caches.invalidate_all().await;
        self.slugs.clear().await;
    }

    pub async fn stats(&self) -> ResolverStats {
        ResolverStats {
            caches: self.caches.stats().await,
            pool_capacity: self.pool.capacity(),
            pool_in_use: self.pool.in_use(),
            pool_waiting: self.pool.waiting(),
            indexed_slugs: self.slugs.len().await,
        }
    }

    /// Refuse further automation work. Sessions already leased finish normally.
    pub fn shutdown(&self) {
        self.pool.close();
        tracing::info!("Content resolver shut down");
    }
}
