//! Fetch-and-filter proxy for upstream master playlists

use super::filter::{ContentKind, LanguagePolicy, filter};
use crate::cache::TtlCache;
use crate::config::ManifestSettings;
use crate::{Error, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Downloads master playlists with `reqwest`, filters them and caches the
/// result. Independent of the automation pool.
#[derive(Debug, Clone)]
pub struct ManifestProxy {
    client: Client,
    cache: Arc<TtlCache<String, String>>,
    settings: ManifestSettings,
}

impl ManifestProxy {
    pub fn new(cache: Arc<TtlCache<String, String>>, settings: ManifestSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.upstream_timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, cache, settings))
    }

    pub fn with_client(
        client: Client,
        cache: Arc<TtlCache<String, String>>,
        settings: ManifestSettings,
    ) -> Self {
        Self {
            client,
            cache,
            settings,
        }
    }

    /// Cache key: kind, host and path. The query string is ignored.
    pub fn cache_key(url: &Url, kind: ContentKind) -> String {
        format!(
            "{}:{}{}",
            kind.as_str(),
            url.host_str().unwrap_or_default(),
            url.path()
        )
    }

    /// Fetch `upstream_url` and return the filtered playlist.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] for an unparseable URL
    /// - [`Error::Upstream`] when the upstream answers with a non-2xx status
    /// - [`Error::Network`] on transport failure
    pub async fn fetch_filtered(&self, upstream_url: &str, kind: ContentKind) -> Result<String> {
        let url = Url::parse(upstream_url)?;
        let key = Self::cache_key(&url, kind);
        if let Some(filtered) = self.cache.get(&key).await {
            tracing::debug!(key = %key, "Manifest cache hit");
            return Ok(filtered);
        }

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            tracing::warn!(key = %key, phase = "manifest", "Upstream request failed: {}", e);
            Error::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(key = %key, phase = "manifest", status = status.as_u16(), "Upstream rejected request");
            return Err(Error::upstream(status.as_u16(), url.as_str()));
        }

        let base = response.url().clone();
        let raw = response.text().await?;
        let policy = LanguagePolicy::for_kind(&self.settings, kind);
        let filtered = filter(&raw, &base, &policy);
        tracing::debug!(
            key = %key,
            input_lines = raw.lines().count(),
            output_lines = filtered.lines().count(),
            "Filtered manifest"
        );

        self.cache.put(key, filtered.clone()).await;
        Ok(filtered)
    }
}
