//! Configuration management for the content resolver
//!
//! This module handles loading and managing configuration settings
//! for both HTTP server and one-shot CLI modes.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{
    BrowserSettings, CacheSettings, LoggingSettings, ManifestSettings, ServerSettings, Settings,
    SiteSettings,
};
