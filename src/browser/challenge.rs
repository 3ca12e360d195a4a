//! Bot-challenge page detection

use super::AutomationPage;
use crate::Result;
use std::time::Duration;
use tokio::time::Instant;

/// Recognizes the interstitial served to suspected automation
#[derive(Debug, Clone)]
pub struct ChallengeDetector {
    markers: Vec<String>,
}

impl ChallengeDetector {
    pub fn new(markers: Vec<String>) -> Self {
        let markers = markers
            .into_iter()
            .map(|m| m.to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self { markers }
    }

    /// Whether the title or markup carries a challenge marker
    pub fn is_challenge(&self, title: &str, markup: &str) -> bool {
        let title = title.to_lowercase();
        let markup = markup.to_lowercase();
        self.markers
            .iter()
            .any(|marker| title.contains(marker) || markup.contains(marker))
    }

    /// Check the page right now
    pub async fn page_is_challenged(&self, page: &dyn AutomationPage) -> Result<bool> {
        let title = page.title().await.unwrap_or_default();
        let markup = page.content().await?;
        Ok(self.is_challenge(&title, &markup))
    }

    /// Poll until the marker disappears or `timeout` elapses. Returns `true`
    /// when the page is clear.
    pub async fn wait_until_clear(
        &self,
        page: &dyn AutomationPage,
        timeout: Duration,
        interval: Duration,
    ) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.page_is_challenged(page).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(interval.min(deadline - Instant::now())).await;
        }
    }
}
