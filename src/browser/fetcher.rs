//! Leased, challenge-aware page fetch
//!
//! Loads one URL in a pooled session with subresources refused, waits out the
//! anti-automation interstitial, and caches the final markup by normalized URL.

use super::{Automation, AutomationPage, ChallengeDetector, LeasedPage, PageOptions};
use crate::cache::TtlCache;
use crate::config::BrowserSettings;
use crate::pool::ResourcePool;
use crate::utils::url::normalize_cache_key;
use crate::{Error, Result};
use std::sync::Arc;

/// Fetches rendered markup through the automation pool
pub struct PageFetcher {
    automation: Arc<dyn Automation>,
    pool: Arc<ResourcePool>,
    cache: Arc<TtlCache<String, String>>,
    detector: ChallengeDetector,
    settings: BrowserSettings,
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("pool", &self.pool)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl PageFetcher {
    pub fn new(
        automation: Arc<dyn Automation>,
        pool: Arc<ResourcePool>,
        cache: Arc<TtlCache<String, String>>,
        detector: ChallengeDetector,
        settings: BrowserSettings,
    ) -> Self {
        Self {
            automation,
            pool,
            cache,
            detector,
            settings,
        }
    }

    /// Return the rendered markup of `url`.
    ///
    /// # Errors
    ///
    /// - [`Error::Blocked`] when the challenge page is still up after the wait
    /// - [`Error::Fetch`] when navigation fails at the transport level
    /// - [`Error::PoolClosed`] / [`Error::Browser`] for session problems
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let key = normalize_cache_key(url);
        if let Some(markup) = self.cache.get(&key).await {
            tracing::debug!(key = %key, "Page cache hit");
            return Ok(markup);
        }

        let lease = self.pool.acquire().await?;
        tracing::debug!(key = %key, lease = lease.id(), phase = "open", "Fetching page");

        let handle = self.automation.open_page(PageOptions::markup()).await?;
        let page = LeasedPage::new(handle.page, lease);
        let result = self.load(page.page(), url).await;
        if let Err(e) = page.close().await {
            tracing::debug!(key = %key, phase = "close", "Failed to close page: {}", e);
        }

        match result {
            Ok(markup) => {
                self.cache.put(key, markup.clone()).await;
                Ok(markup)
            }
            Err(e) => {
                tracing::warn!(key = %key, phase = "fetch", kind = e.kind(), "Page fetch failed: {}", e);
                Err(e)
            }
        }
    }

    async fn load(&self, page: &dyn AutomationPage, url: &str) -> Result<String> {
        match tokio::time::timeout(self.settings.navigation_timeout(), page.navigate(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                // Whatever has rendered so far is still worth inspecting
                tracing::warn!(
                    key = %url,
                    phase = "navigate",
                    "Navigation did not complete within {:?}",
                    self.settings.navigation_timeout()
                );
            }
        }

        let clear = self
            .detector
            .wait_until_clear(
                page,
                self.settings.challenge_timeout(),
                self.settings.challenge_poll_interval(),
            )
            .await?;
        if !clear {
            return Err(Error::blocked(url));
        }

        page.content().await
    }
}
