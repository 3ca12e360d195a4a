//! Classification of observed network responses

use super::{DiscoveryStrategy, StreamCandidate, TransportKind};
use crate::utils::url::{host_matches, path_extension};
use url::Url;

/// Hosts whose traffic never carries the content stream
pub const IGNORED_HOSTS: &[&str] = &[
    "google-analytics.com",
    "googletagmanager.com",
    "googlesyndication.com",
    "doubleclick.net",
    "adservice.google.com",
    "amazon-adsystem.com",
    "facebook.net",
    "facebook.com",
    "twitter.com",
    "hotjar.com",
    "scorecardresearch.com",
    "cloudflareinsights.com",
    "disqus.com",
];

pub const SINGLE_FILE_EXTENSIONS: &[&str] = &["mp4", "webm", "m4v"];

/// Transport kind implied by a URL's extension, if it is a media URL at all
pub fn transport_kind(url: &Url) -> Option<TransportKind> {
    match path_extension(url)?.as_str() {
        "m3u8" => Some(TransportKind::SegmentedPlaylist),
        ext if SINGLE_FILE_EXTENSIONS.contains(&ext) => Some(TransportKind::SingleFile),
        _ => None,
    }
}

/// Turns observed response URLs into stream candidates
#[derive(Debug, Clone)]
pub struct NetworkClassifier {
    cdn_hosts: Vec<String>,
    ignored_hosts: Vec<String>,
}

impl NetworkClassifier {
    pub fn new(cdn_hosts: Vec<String>) -> Self {
        Self {
            cdn_hosts,
            ignored_hosts: IGNORED_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// Candidate for a media URL served from a CDN host, `None` for everything
    /// else
    pub fn classify(&self, raw: &str) -> Option<StreamCandidate> {
        let url = Url::parse(raw).ok()?;
        if host_matches(&url, &self.ignored_hosts) || !host_matches(&url, &self.cdn_hosts) {
            return None;
        }
        let kind = transport_kind(&url)?;
        Some(StreamCandidate {
            url: url.to_string(),
            kind,
            strategy: DiscoveryStrategy::Network,
        })
    }
}
