//! Mapping from catalog coordinates to site slugs

use std::collections::HashMap;
use tokio::sync::RwLock;

/// `(series_id, season, episode)` coordinate
pub type EpisodeKey = (String, u32, u32);

/// Slugs discovered by episode-list resolution, looked up when a stream is
/// requested by catalog coordinates instead of slug
#[derive(Debug, Default)]
pub struct SlugIndex {
    entries: RwLock<HashMap<EpisodeKey, String>>,
}

impl SlugIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, series_id: &str, season: u32, episode: u32, slug: &str) {
        self.entries
            .write()
            .await
            .insert((series_id.to_string(), season, episode), slug.to_string());
    }

    /// Drop every coordinate of `series_id`, then index `episodes` under
    /// `season`. Coordinates missing from a newer listing stop resolving.
    pub async fn replace_series(
        &self,
        series_id: &str,
        season: u32,
        episodes: impl IntoIterator<Item = (u32, String)>,
    ) {
        let mut entries = self.entries.write().await;
        entries.retain(|(series, _, _), _| series != series_id);
        for (episode, slug) in episodes {
            entries.insert((series_id.to_string(), season, episode), slug);
        }
    }

    pub async fn lookup(&self, series_id: &str, season: u32, episode: u32) -> Option<String> {
        self.entries
            .read()
            .await
            .get(&(series_id.to_string(), season, episode))
            .cloned()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
