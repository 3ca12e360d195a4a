//! Configuration loading utilities
//!
//! Provides helper functions for loading configuration from various sources
//! with proper error handling and validation.

use crate::{Result, config::Settings};
use std::path::Path;
use tracing::{debug, info, warn};

/// Configuration loader with multiple source support
#[derive(Debug)]
pub struct ConfigLoader {
    /// Default settings
    defaults: Settings,
}

impl ConfigLoader {
    /// Create new configuration loader
    pub fn new() -> Self {
        Self {
            defaults: Settings::default(),
        }
    }

    /// Load configuration with precedence order:
    /// 1. Command line arguments (highest priority, applied by the caller)
    /// 2. Environment variables
    /// 3. Configuration file
    /// 4. Default values (lowest priority)
    pub fn load(&self, config_file: Option<&Path>) -> Result<Settings> {
        let mut settings = self.defaults.clone();

        if let Some(path) = config_file {
            if path.exists() {
                info!("Loading configuration from file: {:?}", path);
                settings = Settings::from_file(path)?;
            } else {
                warn!("Configuration file not found: {:?}, using defaults", path);
            }
        } else if let Some(path) = Settings::default_config_path().filter(|p| p.exists()) {
            info!("Loading configuration from default location: {:?}", path);
            settings = Settings::from_file(&path)?;
        }

        debug!("Applying environment variable overrides");
        settings = settings.merge_with_env()?;

        settings.validate()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:?}", settings);

        Ok(settings)
    }

    /// Load configuration from environment only
    pub fn from_env_only(&self) -> Result<Settings> {
        let settings = Settings::from_env()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Get default configuration
    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_defaults() {
        let loader = ConfigLoader::new();
        let settings = loader.defaults();

        assert_eq!(settings.server.port, 7515);
        assert_eq!(settings.cache.scrape_ttl_hours, 6);
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 8080

[browser]
stream_grace_secs = 4

[manifest]
primary_language = "es"
        "#
        )
        .unwrap();

        let loader = ConfigLoader::new();
        let settings = loader.load(Some(temp_file.path())).unwrap();

        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.browser.stream_grace_secs, 4);
        assert_eq!(settings.browser.challenge_timeout_secs, 20);
        assert_eq!(settings.manifest.primary_language, "es");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[browser]\npool_size = \"many\"").unwrap();

        let loader = ConfigLoader::new();
        let err = loader.load(Some(temp_file.path())).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let loader = ConfigLoader::new();
        let settings = loader
            .load(Some(Path::new("/definitely/not/here/config.toml")))
            .unwrap();
        assert_eq!(settings.browser.navigation_timeout_secs, 30);
    }

    #[test]
    fn test_env_var_override() {
        unsafe {
            std::env::set_var("POOL_SIZE", "7");
            std::env::set_var("CDN_BASE_URL", "https://cdn.example.test/hls");
        }

        let loader = ConfigLoader::new();
        let settings = loader.from_env_only().unwrap();

        assert_eq!(settings.browser.pool_size, 7);
        assert_eq!(settings.site.cdn_base_url, "https://cdn.example.test/hls");

        unsafe {
            std::env::remove_var("POOL_SIZE");
            std::env::remove_var("CDN_BASE_URL");
        }
    }
}
