//! Error type definitions
//!
//! Defines the main error types used throughout the resolver. The first four
//! variants are the pipeline's failure taxonomy; resolvers absorb them at their
//! own boundary, everything else is plumbing.

use thiserror::Error;

/// Main error type for the content resolver
#[derive(Error, Debug)]
pub enum Error {
    /// Anti-automation challenge still present after the wait bound
    #[error("Blocked by anti-automation challenge: {url}")]
    Blocked { url: String },

    /// Well-formed response without the requested data
    #[error("Not found: {key}")]
    NotFound { key: String },

    /// Navigation or transport failure while loading a page
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Markup fetched but no recognizable structure in it
    #[error("No recognizable content in {url}")]
    ParseEmpty { url: String },

    /// Browser automation errors
    #[error("Browser automation error: {0}")]
    Browser(String),

    /// Session pool has been shut down
    #[error("Session pool is closed")]
    PoolClosed,

    /// Upstream manifest returned a non-success status
    #[error("Upstream returned HTTP {status} for {url}")]
    Upstream { status: u16, url: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP client errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a blocked error
    pub fn blocked(url: impl Into<String>) -> Self {
        Self::Blocked { url: url.into() }
    }

    /// Create a not found error
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a fetch error
    pub fn fetch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse-empty error
    pub fn parse_empty(url: impl Into<String>) -> Self {
        Self::ParseEmpty { url: url.into() }
    }

    /// Create a browser automation error
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Create an upstream status error
    pub fn upstream(status: u16, url: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            url: url.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this is the anti-automation failure kind. Callers should not
    /// retry these immediately.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    /// Short machine-readable name of the failure kind, used in log fields
    /// and HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Blocked { .. } => "blocked",
            Self::NotFound { .. } => "not_found",
            Self::Fetch { .. } | Self::Network(_) => "fetch_error",
            Self::ParseEmpty { .. } => "parse_empty",
            Self::Browser(_) => "browser",
            Self::PoolClosed => "pool_closed",
            Self::Upstream { .. } => "upstream",
            Self::Config(_) => "config",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
            Self::Url(_) => "url",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Browser(err.to_string())
    }
}
