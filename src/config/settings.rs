//! Configuration settings structure
//!
//! Defines the main settings structure and loading logic for the resolver.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration settings for the content resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server configuration
    pub server: ServerSettings,
    /// Origin site conventions
    pub site: SiteSettings,
    /// Headless browser and session pool configuration
    pub browser: BrowserSettings,
    /// Cache configuration
    pub cache: CacheSettings,
    /// Manifest filtering configuration
    pub manifest: ManifestSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
    /// Optional JSON catalog replacing the built-in one
    pub catalog_path: Option<PathBuf>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Where things live on the origin site and how its pages look
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Site origin, used to build page URLs and absolutize markup URLs
    pub base_url: String,
    /// HLS root on the CDN
    pub cdn_base_url: String,
    /// Path prefix of a single content item, followed by its slug
    pub content_path_prefix: String,
    /// Host suffixes that count as the origin CDN
    pub cdn_hosts: Vec<String>,
    /// Markers in title or markup that identify the bot-challenge page
    pub challenge_markers: Vec<String>,
    /// Words ignored when comparing headings with series names
    pub branding_words: Vec<String>,
    /// Substring identifying thumbnail image URLs
    pub thumbnail_marker: String,
}

/// Headless browser and session pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Maximum concurrent automation sessions
    pub pool_size: usize,
    /// Run the browser without a window
    pub headless: bool,
    /// Explicit Chrome/Chromium executable
    pub executable: Option<PathBuf>,
    /// User agent presented to the origin
    pub user_agent: String,
    /// Navigation bound in seconds
    pub navigation_timeout_secs: u64,
    /// How long to wait for the challenge page to clear, in seconds
    pub challenge_timeout_secs: u64,
    /// Challenge polling interval in milliseconds
    pub challenge_poll_millis: u64,
    /// Grace period after page load while waiting for a stream URL, in seconds
    pub stream_grace_secs: u64,
    /// Grace period after activating the play control, in seconds
    pub interaction_grace_secs: u64,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// TTL for scraped markup, episode lists and stream URLs, in hours
    pub scrape_ttl_hours: u64,
    /// TTL for filtered manifests, in hours
    pub manifest_ttl_hours: u64,
    /// Maximum entries per scrape namespace
    pub max_entries: usize,
    /// Maximum filtered manifests kept
    pub manifest_max_entries: usize,
}

/// Manifest filtering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestSettings {
    /// Language kept for audio and subtitles
    pub primary_language: String,
    /// Original-language audio additionally kept for movies
    pub original_language: String,
    /// Upstream request timeout in seconds
    pub upstream_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "::".to_string(),
            port: 7515,
            timeout_secs: 60,
        }
    }
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.pokeflix.tv".to_string(),
            cdn_base_url: "https://v1.pkflx.com/hls".to_string(),
            content_path_prefix: "/v/".to_string(),
            cdn_hosts: vec!["pkflx.com".to_string()],
            challenge_markers: vec![
                "Just a moment".to_string(),
                "Checking your browser".to_string(),
                "cf-browser-verification".to_string(),
            ],
            branding_words: vec!["pokemon".to_string(), "pokémon".to_string()],
            thumbnail_marker: "/static/thumbnails/".to_string(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            pool_size: 3,
            headless: true,
            executable: None,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            navigation_timeout_secs: 30,
            challenge_timeout_secs: 20,
            challenge_poll_millis: 500,
            stream_grace_secs: 6,
            interaction_grace_secs: 3,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            scrape_ttl_hours: 6,
            manifest_ttl_hours: 24,
            max_entries: 500,
            manifest_max_entries: 500,
        }
    }
}

impl Default for ManifestSettings {
    fn default() -> Self {
        Self {
            primary_language: "en".to_string(),
            original_language: "ja".to_string(),
            upstream_timeout_secs: 15,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            verbose: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            site: SiteSettings::default(),
            browser: BrowserSettings::default(),
            cache: CacheSettings::default(),
            manifest: ManifestSettings::default(),
            logging: LoggingSettings::default(),
            catalog_path: None,
        }
    }
}

impl BrowserSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_secs(self.challenge_timeout_secs)
    }

    pub fn challenge_poll_interval(&self) -> Duration {
        Duration::from_millis(self.challenge_poll_millis)
    }

    pub fn stream_grace(&self) -> Duration {
        Duration::from_secs(self.stream_grace_secs)
    }

    pub fn interaction_grace(&self) -> Duration {
        Duration::from_secs(self.interaction_grace_secs)
    }
}

impl CacheSettings {
    pub fn scrape_ttl(&self) -> Duration {
        Duration::from_secs(self.scrape_ttl_hours * 3600)
    }

    pub fn manifest_ttl(&self) -> Duration {
        Duration::from_secs(self.manifest_ttl_hours * 3600)
    }
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file. Missing sections and keys keep their
    /// defaults.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| {
            crate::Error::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// Load settings from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::default().merge_with_env()
    }

    /// Apply environment variable overrides on top of these settings
    pub fn merge_with_env(mut self) -> crate::Result<Self> {
        if let Ok(host) = std::env::var("RESOLVER_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid port: {}", e)))?;
        }

        if let Ok(size) = std::env::var("POOL_SIZE") {
            self.browser.pool_size = size
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid pool size: {}", e)))?;
        }

        if let Ok(base) = std::env::var("SITE_BASE_URL") {
            self.site.base_url = base;
        }

        if let Ok(cdn) = std::env::var("CDN_BASE_URL") {
            self.site.cdn_base_url = cdn;
        }

        if let Ok(executable) = std::env::var("CHROME_EXECUTABLE") {
            self.browser.executable = Some(PathBuf::from(executable));
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.browser.pool_size == 0 {
            return Err(crate::Error::config("browser.pool_size must be at least 1"));
        }
        if self.cache.max_entries == 0 || self.cache.manifest_max_entries == 0 {
            return Err(crate::Error::config("cache capacities must be at least 1"));
        }
        url::Url::parse(&self.site.base_url)
            .map_err(|e| crate::Error::config(format!("Invalid site.base_url: {}", e)))?;
        url::Url::parse(&self.site.cdn_base_url)
            .map_err(|e| crate::Error::config(format!("Invalid site.cdn_base_url: {}", e)))?;
        if !self.site.content_path_prefix.starts_with('/') {
            return Err(crate::Error::config(
                "site.content_path_prefix must start with '/'",
            ));
        }
        if self.manifest.primary_language.trim().is_empty() {
            return Err(crate::Error::config("manifest.primary_language is empty"));
        }
        Ok(())
    }

    /// Default config file location, e.g. `~/.config/pokeflix-resolver/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pokeflix-resolver").join("config.toml"))
    }
}
