//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests, chiefly
//! [`helpers::FakeSite`]: a scripted automation backend serving canned pages,
//! timed network responses and challenge interstitials.

#![allow(dead_code)]

/// Test helper functions
pub mod helpers {
    use async_trait::async_trait;
    use pokeflix_resolver::{
        ContentResolver, Error, Result, SeriesDescriptor, Settings,
        browser::{Automation, AutomationPage, PageHandle, PageOptions},
    };
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedSender};
    use tokio::task::JoinHandle;
    use tokio::time::Instant;

    pub const SITE: &str = "https://www.pokeflix.tv";
    pub const CDN: &str = "https://v1.pkflx.com/hls";

    const CHALLENGE_MARKUP: &str =
        "<html><head><title>Just a moment...</title></head><body>Checking your browser</body></html>";

    /// One scripted page
    #[derive(Debug, Clone, Default)]
    pub struct FakePage {
        pub markup: String,
        pub title: String,
        /// Time `navigate` takes to resolve
        pub load_delay: Duration,
        /// `navigate` fails with this reason after `load_delay`
        pub nav_error: Option<String>,
        /// Response URLs reported at the given offset from navigation start
        pub responses: Vec<(Duration, String)>,
        /// Response URLs reported at the given offset from play activation
        pub on_play: Vec<(Duration, String)>,
        /// The challenge interstitial is shown for this long after navigation
        pub challenge_for: Option<Duration>,
    }

    impl FakePage {
        pub fn with_markup(markup: impl Into<String>) -> Self {
            Self {
                markup: markup.into(),
                load_delay: Duration::from_millis(200),
                ..Self::default()
            }
        }

        pub fn load_delay(mut self, delay: Duration) -> Self {
            self.load_delay = delay;
            self
        }

        pub fn response(mut self, at: Duration, url: impl Into<String>) -> Self {
            self.responses.push((at, url.into()));
            self
        }

        pub fn on_play(mut self, at: Duration, url: impl Into<String>) -> Self {
            self.on_play.push((at, url.into()));
            self
        }

        pub fn challenge_for(mut self, duration: Duration) -> Self {
            self.challenge_for = Some(duration);
            self
        }

        pub fn nav_error(mut self, reason: impl Into<String>) -> Self {
            self.nav_error = Some(reason.into());
            self
        }
    }

    #[derive(Default)]
    struct SiteState {
        pages: Mutex<HashMap<String, FakePage>>,
        navigations: Mutex<Vec<String>>,
        open: AtomicUsize,
        max_open: AtomicUsize,
        opened: AtomicUsize,
    }

    /// Scripted automation backend keyed by URL
    #[derive(Clone, Default)]
    pub struct FakeSite {
        state: Arc<SiteState>,
    }

    impl FakeSite {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(&self, url: impl Into<String>, page: FakePage) -> &Self {
            self.state
                .pages
                .lock()
                .unwrap()
                .insert(url.into(), page);
            self
        }

        /// Navigations to `url` so far
        pub fn navigations_to(&self, url: &str) -> usize {
            self.state
                .navigations
                .lock()
                .unwrap()
                .iter()
                .filter(|u| u.as_str() == url)
                .count()
        }

        pub fn total_navigations(&self) -> usize {
            self.state.navigations.lock().unwrap().len()
        }

        /// Pages currently open
        pub fn open_pages(&self) -> usize {
            self.state.open.load(Ordering::SeqCst)
        }

        /// Highest number of simultaneously open pages observed
        pub fn max_open_pages(&self) -> usize {
            self.state.max_open.load(Ordering::SeqCst)
        }

        pub fn pages_opened(&self) -> usize {
            self.state.opened.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Automation for FakeSite {
        async fn open_page(&self, options: PageOptions) -> Result<PageHandle> {
            let (tx, rx) = mpsc::unbounded_channel();
            let open = self.state.open.fetch_add(1, Ordering::SeqCst) + 1;
            self.state.max_open.fetch_max(open, Ordering::SeqCst);
            self.state.opened.fetch_add(1, Ordering::SeqCst);

            let page = ScriptedPage {
                state: self.state.clone(),
                tx: options.observe_network.then_some(tx),
                current: Mutex::new(None),
                tasks: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            };
            Ok(PageHandle {
                page: Box::new(page),
                responses: rx,
            })
        }
    }

    struct ScriptedPage {
        state: Arc<SiteState>,
        tx: Option<UnboundedSender<String>>,
        current: Mutex<Option<(FakePage, Instant)>>,
        tasks: Mutex<Vec<JoinHandle<()>>>,
        closed: AtomicBool,
    }

    impl ScriptedPage {
        fn emit(&self, schedule: &[(Duration, String)]) {
            let Some(tx) = self.tx.clone() else {
                return;
            };
            let start = Instant::now();
            let mut schedule = schedule.to_vec();
            schedule.sort_by_key(|(at, _)| *at);
            let task = tokio::spawn(async move {
                for (at, url) in schedule {
                    tokio::time::sleep_until(start + at).await;
                    if tx.send(url).is_err() {
                        return;
                    }
                }
            });
            self.tasks.lock().unwrap().push(task);
        }

        fn challenged(&self) -> Option<bool> {
            let current = self.current.lock().unwrap();
            let (page, navigated_at) = current.as_ref()?;
            Some(
                page.challenge_for
                    .is_some_and(|duration| navigated_at.elapsed() < duration),
            )
        }
    }

    #[async_trait]
    impl AutomationPage for ScriptedPage {
        async fn navigate(&self, url: &str) -> Result<()> {
            self.state.navigations.lock().unwrap().push(url.to_string());
            let page = self
                .state
                .pages
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or_else(|| {
                    FakePage::with_markup("<html><body><h1>Page not found</h1></body></html>")
                });

            *self.current.lock().unwrap() = Some((page.clone(), Instant::now()));
            self.emit(&page.responses);

            tokio::time::sleep(page.load_delay).await;
            match page.nav_error {
                Some(reason) => Err(Error::fetch(url, reason)),
                None => Ok(()),
            }
        }

        async fn content(&self) -> Result<String> {
            match self.challenged() {
                Some(true) => Ok(CHALLENGE_MARKUP.to_string()),
                Some(false) => Ok(self
                    .current
                    .lock()
                    .unwrap()
                    .as_ref()
                    .map(|(page, _)| page.markup.clone())
                    .unwrap_or_default()),
                None => Ok(String::new()),
            }
        }

        async fn title(&self) -> Result<String> {
            match self.challenged() {
                Some(true) => Ok("Just a moment...".to_string()),
                Some(false) => Ok(self
                    .current
                    .lock()
                    .unwrap()
                    .as_ref()
                    .map(|(page, _)| page.title.clone())
                    .unwrap_or_default()),
                None => Ok(String::new()),
            }
        }

        async fn activate_playback(&self) -> Result<bool> {
            let on_play = self
                .current
                .lock()
                .unwrap()
                .as_ref()
                .map(|(page, _)| page.on_play.clone())
                .unwrap_or_default();
            self.emit(&on_play);
            Ok(!on_play.is_empty())
        }

        async fn close(&self) -> Result<()> {
            for task in self.tasks.lock().unwrap().drain(..) {
                task.abort();
            }
            if !self.closed.swap(true, Ordering::SeqCst) {
                self.state.open.fetch_sub(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    /// Default settings pointed at the canonical site and CDN
    pub fn create_test_settings() -> Settings {
        let mut settings = Settings::default();
        settings.site.base_url = SITE.to_string();
        settings.site.cdn_base_url = CDN.to_string();
        settings
    }

    pub fn create_test_resolver(site: &FakeSite, settings: Settings) -> ContentResolver {
        ContentResolver::with_automation(settings, Arc::new(site.clone()))
            .expect("test resolver")
    }

    pub fn indigo_league() -> SeriesDescriptor {
        SeriesDescriptor::new("pokeflix-s01", "Pokémon: Indigo League", "01-indigo-league", 82)
    }

    pub fn listing_url(series: &SeriesDescriptor) -> String {
        format!("{}{}", SITE, series.listing_path)
    }

    pub fn detail_url(slug: &str) -> String {
        format!("{}/v/{}", SITE, slug)
    }

    /// Listing card whose heading carries the episode number
    pub fn numbered_card(slug: &str, number: u32, title: &str) -> String {
        format!(
            r#"<div class="card"><a href="/v/{slug}"><img data-src="/static/thumbnails/01-indigo-league/{number}.jpg"></a><h4>{number:02} - {title}</h4></div>"#
        )
    }

    /// Listing card with no heading of its own
    pub fn bare_card(slug: &str) -> String {
        format!(r#"<div><div><a href="/v/{slug}">watch</a></div></div>"#)
    }

    /// Listing page: numbered cards, then unnumbered cards under a section
    /// heading repeating the series name
    pub fn listing(numbered: &[String], unnumbered: &[String]) -> String {
        format!(
            "<html><head><title>Indigo League</title></head><body>\
             <section>{}</section>\
             <section><h2>Pokémon: Indigo League</h2>{}</section>\
             </body></html>",
            numbered.join("\n"),
            unnumbered.join("\n")
        )
    }

    pub fn playlist_url(path: &str) -> String {
        format!("{}/{}/playlist.m3u8", CDN, path)
    }
}
