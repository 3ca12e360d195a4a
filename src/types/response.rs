//! Response type definitions
//!
//! JSON bodies returned by the HTTP server and printed by the CLI.

use crate::resolver::{EpisodeRecord, ResolverStats, StreamResolution, TransportKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolved episode list of one series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodesResponse {
    pub series_id: String,
    pub name: String,
    pub episodes: Vec<EpisodeRecord>,
    pub resolved_at: DateTime<Utc>,
}

impl EpisodesResponse {
    pub fn new(series_id: impl Into<String>, name: impl Into<String>, episodes: Vec<EpisodeRecord>) -> Self {
        Self {
            series_id: series_id.into(),
            name: name.into(),
            episodes,
            resolved_at: Utc::now(),
        }
    }
}

/// Result of a stream lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamResponse {
    /// `found`, `fallback`, `not_found` or `blocked`
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransportKind>,
    /// How the URL was obtained: a discovery strategy name, `cdn` or
    /// `cdn_fallback`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl StreamResponse {
    pub fn from_resolution(resolution: &StreamResolution) -> Self {
        let found = resolution.found();
        Self {
            status: resolution.status().to_string(),
            url: found.map(|s| s.url.clone()),
            kind: found.map(|s| s.kind),
            source: found.and_then(|s| {
                serde_json::to_value(s.strategy)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
            }),
        }
    }

    /// Playlist whose CDN location follows from the catalog alone
    pub fn cdn_direct(url: impl Into<String>) -> Self {
        Self {
            status: "found".to_string(),
            url: Some(url.into()),
            kind: Some(TransportKind::SegmentedPlaylist),
            source: Some("cdn".to_string()),
        }
    }

    /// Direct CDN playlist used when resolution came up empty
    pub fn cdn_fallback(url: impl Into<String>) -> Self {
        Self {
            status: "fallback".to_string(),
            url: Some(url.into()),
            kind: Some(TransportKind::SegmentedPlaylist),
            source: Some("cdn_fallback".to_string()),
        }
    }
}

/// Ping response for health checks
#[derive(Debug, Clone, Serialize)]
pub struct PingResponse {
    /// Server uptime in seconds
    pub server_uptime: u64,

    /// Server version
    pub version: String,

    pub resolver: ResolverStats,
}

impl PingResponse {
    pub fn new(server_uptime: u64, version: impl Into<String>, resolver: ResolverStats) -> Self {
        Self {
            server_uptime,
            version: version.into(),
            resolver,
        }
    }
}

/// Error response for API errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Machine-readable error kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: None,
        }
    }

    pub fn from_error(error: &crate::Error) -> Self {
        Self {
            error: error.to_string(),
            kind: Some(error.kind().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{DiscoveryStrategy, StreamCandidate};

    #[test]
    fn test_stream_response_found() {
        let resolution = StreamResolution::Found(StreamCandidate {
            url: "https://v1.pkflx.com/hls/01/playlist.m3u8".into(),
            kind: TransportKind::SegmentedPlaylist,
            strategy: DiscoveryStrategy::MediaElement,
        });
        let response = StreamResponse::from_resolution(&resolution);

        assert_eq!(response.status, "found");
        assert_eq!(response.source.as_deref(), Some("media_element"));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["kind"], "segmented_playlist");
    }

    #[test]
    fn test_stream_response_not_found_omits_url() {
        let response = StreamResponse::from_resolution(&StreamResolution::Blocked);
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"status":"blocked"}"#);
    }

    #[test]
    fn test_error_response_kind() {
        let response = ErrorResponse::from_error(&crate::Error::upstream(404, "https://x"));
        assert_eq!(response.kind.as_deref(), Some("upstream"));

        let json = serde_json::to_string(&ErrorResponse::new("Unknown series")).unwrap();
        assert_eq!(json, r#"{"error":"Unknown series"}"#);
    }

    #[test]
    fn test_episodes_response_serialization() {
        let response = EpisodesResponse::new(
            "pokeflix-s01",
            "Pokémon: Indigo League",
            vec![EpisodeRecord {
                number: 1,
                title: "Pokémon, I Choose You!".into(),
                thumbnail: None,
                source_slug: "01-pokemon-i-choose-you".into(),
            }],
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["episodes"][0]["number"], 1);
        assert!(json["resolved_at"].is_string());
    }
}
