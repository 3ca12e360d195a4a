//! Request type definitions
//!
//! Query strings accepted by the HTTP server.

use crate::manifest::ContentKind;
use serde::{Deserialize, Serialize};

/// Query of `GET /manifest/{*path}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestQuery {
    /// Title kind deciding which audio languages survive; series by default
    #[serde(default)]
    pub kind: ContentKind,
}

/// Query of the coordinate stream route
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamQuery {
    /// Skip the direct CDN fallback and report the raw resolution outcome
    #[serde(default)]
    pub strict: bool,
}
