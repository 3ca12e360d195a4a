//! Chromium backend for [`Automation`] via `chromiumoxide`
//!
//! The browser process is launched lazily on the first page request, so a
//! resolver that only filters manifests never spawns Chrome.

use super::{Automation, AutomationPage, PageHandle, PageOptions};
use crate::config::BrowserSettings;
use crate::{Error, Result};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, EventResponseReceived, ResourceType, SetUserAgentOverrideParams,
};
use futures::StreamExt;
use tokio::sync::{OnceCell, mpsc};
use tokio::task::JoinHandle;

/// Clicks the most likely play control, or starts the first video directly.
const ACTIVATE_PLAYBACK_JS: &str = r#"(() => {
    const selectors = [
        '.vjs-big-play-button',
        '.jw-icon-display',
        '.plyr__control--overlaid',
        'button[aria-label*="play" i]',
        '[class*="play-button"]',
        '[class*="play_button"]',
    ];
    for (const selector of selectors) {
        const el = document.querySelector(selector);
        if (el) { el.click(); return true; }
    }
    const video = document.querySelector('video');
    if (video) {
        const started = video.play();
        if (started && started.catch) { started.catch(() => {}); }
        return true;
    }
    return false;
})()"#;

struct LaunchedBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// Launches and drives a headless Chromium
pub struct ChromeAutomation {
    settings: BrowserSettings,
    launched: OnceCell<LaunchedBrowser>,
}

impl std::fmt::Debug for ChromeAutomation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeAutomation")
            .field("headless", &self.settings.headless)
            .field("launched", &self.launched.initialized())
            .finish()
    }
}

impl ChromeAutomation {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            launched: OnceCell::new(),
        }
    }

    async fn browser(&self) -> Result<&Browser> {
        let launched = self.launched.get_or_try_init(|| self.launch()).await?;
        Ok(&launched.browser)
    }

    async fn launch(&self) -> Result<LaunchedBrowser> {
        tracing::info!("Launching headless browser");

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--mute-audio")
            .request_timeout(self.settings.navigation_timeout());
        if !self.settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.settings.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(Error::browser)?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {}", e);
                }
            }
            tracing::info!("Browser connection closed");
        });

        Ok(LaunchedBrowser { browser, handler })
    }

    /// Fail subresources the pipeline never needs; report blocked media
    /// requests as observations since they will never produce a response.
    async fn install_blocking(
        page: &Page,
        observer: Option<mpsc::UnboundedSender<String>>,
    ) -> Result<JoinHandle<()>> {
        let mut paused = page.event_listener::<EventRequestPaused>().await?;
        page.execute(
            EnableParams::builder()
                .pattern(RequestPattern::builder().url_pattern("*").build())
                .build(),
        )
        .await?;

        let page = page.clone();
        Ok(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let outcome = if is_blocked_resource(&event.resource_type) {
                    if event.resource_type == ResourceType::Media {
                        if let Some(tx) = &observer {
                            let _ = tx.send(event.request.url.clone());
                        }
                    }
                    page.execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
                } else {
                    page.execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = outcome {
                    tracing::trace!("Request interception failed: {}", e);
                }
            }
        }))
    }

    async fn install_observer(
        page: &Page,
        tx: mpsc::UnboundedSender<String>,
    ) -> Result<JoinHandle<()>> {
        let mut responses = page.event_listener::<EventResponseReceived>().await?;
        Ok(tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                if tx.send(event.response.url.clone()).is_err() {
                    break;
                }
            }
        }))
    }
}

fn is_blocked_resource(kind: &ResourceType) -> bool {
    matches!(
        kind,
        ResourceType::Image | ResourceType::Media | ResourceType::Font | ResourceType::Stylesheet
    )
}

#[async_trait]
impl Automation for ChromeAutomation {
    async fn open_page(&self, options: PageOptions) -> Result<PageHandle> {
        let browser = self.browser().await?;
        let page = browser.new_page("about:blank").await?;

        match self.prepare(&page, options).await {
            Ok((tasks, responses)) => Ok(PageHandle {
                page: Box::new(ChromePage { page, tasks }),
                responses,
            }),
            Err(e) => {
                if let Err(close_err) = page.close().await {
                    tracing::debug!("Failed to close half-prepared page: {}", close_err);
                }
                Err(e)
            }
        }
    }
}

impl ChromeAutomation {
    async fn prepare(
        &self,
        page: &Page,
        options: PageOptions,
    ) -> Result<(Vec<JoinHandle<()>>, mpsc::UnboundedReceiver<String>)> {
        page.set_user_agent(SetUserAgentOverrideParams::new(
            self.settings.user_agent.clone(),
        ))
        .await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut tasks = Vec::new();

        if options.block_subresources {
            let observer = options.observe_network.then(|| tx.clone());
            tasks.push(Self::install_blocking(page, observer).await?);
        }
        if options.observe_network {
            tasks.push(Self::install_observer(page, tx.clone()).await?);
        }

        Ok((tasks, rx))
    }
}

impl Drop for ChromeAutomation {
    fn drop(&mut self) {
        if let Some(launched) = self.launched.get() {
            launched.handler.abort();
        }
    }
}

/// One Chromium tab plus its listener tasks
struct ChromePage {
    page: Page,
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[async_trait]
impl AutomationPage for ChromePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| Error::fetch(url, e.to_string()))?;
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn title(&self) -> Result<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn activate_playback(&self) -> Result<bool> {
        let activated = self
            .page
            .evaluate(ACTIVATE_PLAYBACK_JS)
            .await?
            .into_value::<bool>()?;
        Ok(activated)
    }

    async fn close(&self) -> Result<()> {
        for task in &self.tasks {
            task.abort();
        }
        self.page.clone().close().await?;
        Ok(())
    }
}
