//! Stream-URL resolution
//!
//! A detail page is opened with network observation on. Observation races
//! against "navigation finished plus a grace period": the first segmented
//! playlist seen on a CDN host ends the race early. If nothing was observed,
//! the challenge page is waited out (still observing), playback is poked once,
//! and finally the markup is searched with [`strategies::discover`].
//!
//! [`strategies::discover`]: super::strategies::discover

use super::network::NetworkClassifier;
use super::strategies;
use super::{ResolvedStream, StreamCandidate, StreamResolution, TransportKind};
use crate::browser::{
    Automation, AutomationPage, ChallengeDetector, LeasedPage, PageHandle, PageOptions,
};
use crate::cache::TtlCache;
use crate::config::{BrowserSettings, SiteSettings};
use crate::pool::ResourcePool;
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

/// Candidates collected from the network so far, in observation order
#[derive(Debug, Default)]
struct Observations {
    candidates: Vec<StreamCandidate>,
}

impl Observations {
    fn push(&mut self, candidate: StreamCandidate) {
        if !self.candidates.iter().any(|c| c.url == candidate.url) {
            self.candidates.push(candidate);
        }
    }

    fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn has_segmented(&self) -> bool {
        self.candidates
            .iter()
            .any(|c| c.kind == TransportKind::SegmentedPlaylist)
    }

    /// First segmented playlist, else the first single file
    fn best(&self) -> Option<StreamCandidate> {
        self.candidates
            .iter()
            .find(|c| c.kind == TransportKind::SegmentedPlaylist)
            .or_else(|| self.candidates.first())
            .cloned()
    }
}

/// Resolves a direct media URL for one content slug
pub struct StreamResolver {
    automation: Arc<dyn Automation>,
    pool: Arc<ResourcePool>,
    cache: Arc<TtlCache<String, ResolvedStream>>,
    detector: ChallengeDetector,
    classifier: NetworkClassifier,
    browser: BrowserSettings,
    base: Url,
    content_prefix: String,
}

impl std::fmt::Debug for StreamResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResolver")
            .field("base", &self.base.as_str())
            .field("content_prefix", &self.content_prefix)
            .finish_non_exhaustive()
    }
}

impl StreamResolver {
    pub fn new(
        automation: Arc<dyn Automation>,
        pool: Arc<ResourcePool>,
        cache: Arc<TtlCache<String, ResolvedStream>>,
        detector: ChallengeDetector,
        site: &SiteSettings,
        browser: BrowserSettings,
    ) -> Result<Self> {
        Ok(Self {
            automation,
            pool,
            cache,
            detector,
            classifier: NetworkClassifier::new(site.cdn_hosts.clone()),
            browser,
            base: Url::parse(&site.base_url)?,
            content_prefix: site.content_path_prefix.clone(),
        })
    }

    /// Detail page URL for a slug
    pub fn detail_url(&self, slug: &str) -> Result<Url> {
        let path = format!(
            "{}/{}",
            self.content_prefix.trim_end_matches('/'),
            slug.trim_matches('/')
        );
        Ok(self.base.join(&path)?)
    }

    /// Resolve `slug`. Only [`StreamResolution::Found`] is cached.
    pub async fn resolve(&self, slug: &str) -> StreamResolution {
        if let Some(stream) = self.cache.get(&slug.to_string()).await {
            tracing::debug!(key = %slug, "Stream cache hit");
            return StreamResolution::Found(stream);
        }

        match self.resolve_uncached(slug).await {
            Ok(Some(stream)) => {
                tracing::info!(
                    key = %slug,
                    strategy = ?stream.strategy,
                    kind = ?stream.kind,
                    "Resolved stream {}",
                    stream.url
                );
                self.cache.put(slug.to_string(), stream.clone()).await;
                StreamResolution::Found(stream)
            }
            Ok(None) => {
                tracing::info!(key = %slug, phase = "fallback", "No stream found");
                StreamResolution::NotFound
            }
            Err(e) => {
                tracing::warn!(
                    key = %slug,
                    phase = "stream",
                    kind = e.kind(),
                    "Stream resolution failed: {}",
                    e
                );
                if e.is_blocked() {
                    StreamResolution::Blocked
                } else {
                    StreamResolution::NotFound
                }
            }
        }
    }

    async fn resolve_uncached(&self, slug: &str) -> Result<Option<ResolvedStream>> {
        let url = self.detail_url(slug)?;
        let lease = self.pool.acquire().await?;
        tracing::debug!(key = %slug, lease = lease.id(), phase = "open", "Inspecting detail page");

        let PageHandle { page, mut responses } =
            self.automation.open_page(PageOptions::observing()).await?;
        let page = LeasedPage::new(page, lease);
        let result = self.inspect(page.page(), &mut responses, &url).await;
        if let Err(e) = page.close().await {
            tracing::debug!(key = %slug, phase = "close", "Failed to close page: {}", e);
        }

        result
    }

    async fn inspect(
        &self,
        page: &dyn AutomationPage,
        responses: &mut UnboundedReceiver<String>,
        url: &Url,
    ) -> Result<Option<ResolvedStream>> {
        let mut observed = Observations::default();

        let settle = async {
            match tokio::time::timeout(self.browser.navigation_timeout(), page.navigate(url.as_str()))
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(key = %url, phase = "navigate", kind = e.kind(), "Navigation failed: {}", e);
                }
                Err(_) => {
                    tracing::warn!(key = %url, phase = "navigate", "Navigation did not complete in time");
                }
            }
            tokio::time::sleep(self.browser.stream_grace()).await;
        };
        let early = self
            .observe_until(responses, &mut observed, settle)
            .await;
        if early {
            tracing::debug!(key = %url, phase = "observe", "Segmented playlist observed early");
        }

        if observed.is_empty() && self.detector.page_is_challenged(page).await? {
            tracing::debug!(key = %url, phase = "challenge", "Waiting for challenge to clear");
            let mut cleared = false;
            let wait = async {
                cleared = self
                    .detector
                    .wait_until_clear(
                        page,
                        self.browser.challenge_timeout(),
                        self.browser.challenge_poll_interval(),
                    )
                    .await
                    .unwrap_or(false);
            };
            let early = self.observe_until(responses, &mut observed, wait).await;
            if !early && !cleared && observed.is_empty() {
                return Err(Error::blocked(url.as_str()));
            }
        }

        if observed.is_empty() {
            match page.activate_playback().await {
                Ok(activated) => {
                    tracing::debug!(key = %url, phase = "interact", activated, "Play control activation");
                }
                Err(e) => {
                    tracing::debug!(key = %url, phase = "interact", "Play control activation failed: {}", e);
                }
            }
            let grace = tokio::time::sleep(self.browser.interaction_grace());
            self.observe_until(responses, &mut observed, grace).await;
        }

        if let Some(candidate) = observed.best() {
            return Ok(Some(candidate));
        }

        let markup = page.content().await?;
        Ok(strategies::discover(&markup, &self.base))
    }

    /// Collect observations until either a segmented playlist shows up
    /// (returns `true`) or `deadline` completes (returns `false`). Responses
    /// already queued when the deadline fires are drained either way.
    async fn observe_until<F>(
        &self,
        responses: &mut UnboundedReceiver<String>,
        observed: &mut Observations,
        deadline: F,
    ) -> bool
    where
        F: std::future::Future<Output = ()>,
    {
        if observed.has_segmented() {
            return true;
        }

        let early = tokio::select! {
            () = self.collect_until_segmented(responses, observed) => true,
            () = deadline => false,
        };

        while let Ok(raw) = responses.try_recv() {
            if let Some(candidate) = self.classifier.classify(&raw) {
                observed.push(candidate);
            }
        }

        early || observed.has_segmented()
    }

    async fn collect_until_segmented(
        &self,
        responses: &mut UnboundedReceiver<String>,
        observed: &mut Observations,
    ) {
        while let Some(raw) = responses.recv().await {
            if let Some(candidate) = self.classifier.classify(&raw) {
                let segmented = candidate.kind == TransportKind::SegmentedPlaylist;
                observed.push(candidate);
                if segmented {
                    return;
                }
            }
        }
        // Observation channel closed; let the deadline decide
        std::future::pending::<()>().await
    }
}
