//! Headless-browser automation
//!
//! The pipeline talks to the browser only through [`Automation`] and
//! [`AutomationPage`], so the Chromium backend can be swapped for a scripted
//! fake in tests.
//!
//! - [`ChromeAutomation`]: `chromiumoxide` backed implementation
//! - [`PageFetcher`]: leased, challenge-aware markup fetch with caching
//! - [`LeasedPage`]: an open page that is closed even when abandoned
//! - [`challenge`]: bot-challenge page detection

pub mod challenge;
pub mod chrome;
pub mod fetcher;

pub use challenge::ChallengeDetector;
pub use chrome::ChromeAutomation;
pub use fetcher::PageFetcher;

use crate::Result;
use crate::pool::Lease;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// How a page should be set up before navigating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    /// Refuse images, media, fonts and stylesheets
    pub block_subresources: bool,
    /// Report the URL of every network response on [`PageHandle::responses`]
    pub observe_network: bool,
}

impl PageOptions {
    /// Markup only: subresources blocked, no network observation
    pub fn markup() -> Self {
        Self {
            block_subresources: true,
            observe_network: false,
        }
    }

    /// Subresources blocked, network responses observed
    pub fn observing() -> Self {
        Self {
            block_subresources: true,
            observe_network: true,
        }
    }
}

/// A freshly opened page plus its network observation channel. The channel
/// is already closed when observation was not requested.
pub struct PageHandle {
    pub page: Box<dyn AutomationPage>,
    pub responses: mpsc::UnboundedReceiver<String>,
}

impl std::fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageHandle").finish_non_exhaustive()
    }
}

/// Opens browser pages
#[async_trait]
pub trait Automation: Send + Sync {
    async fn open_page(&self, options: PageOptions) -> Result<PageHandle>;
}

/// One open browser page
#[async_trait]
pub trait AutomationPage: Send + Sync {
    /// Navigate and resolve once the page reports load completion
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Current serialized DOM
    async fn content(&self) -> Result<String>;

    /// Current document title, empty when there is none
    async fn title(&self) -> Result<String>;

    /// Try to start playback by activating a play control. Returns whether
    /// anything was activated.
    async fn activate_playback(&self) -> Result<bool>;

    /// Close the page and stop its background listeners
    async fn close(&self) -> Result<()>;
}

/// An open page tied to the pool slot it occupies.
///
/// Closing explicitly with [`LeasedPage::close`] is the normal path. If the
/// owner is dropped first (a cancelled request, an early return), the page is
/// closed on a spawned task and the slot is held until that close finishes.
pub struct LeasedPage {
    page: Arc<dyn AutomationPage>,
    lease: Option<Lease>,
}

impl LeasedPage {
    pub fn new(page: Box<dyn AutomationPage>, lease: Lease) -> Self {
        Self {
            page: Arc::from(page),
            lease: Some(lease),
        }
    }

    pub fn page(&self) -> &dyn AutomationPage {
        self.page.as_ref()
    }

    /// Close the page, then give the slot back
    pub async fn close(mut self) -> Result<()> {
        let result = self.page.close().await;
        self.lease.take();
        result
    }
}

impl Drop for LeasedPage {
    fn drop(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };
        let page = self.page.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = page.close().await {
                        tracing::debug!(lease = lease.id(), "Failed to close abandoned page: {}", e);
                    }
                    drop(lease);
                });
            }
            Err(_) => {
                tracing::warn!(lease = lease.id(), "Page dropped outside a runtime; left open");
            }
        }
    }
}

impl std::fmt::Debug for LeasedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeasedPage")
            .field("lease", &self.lease)
            .finish_non_exhaustive()
    }
}
