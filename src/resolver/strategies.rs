//! Markup fallback for stream discovery
//!
//! When no media request was observed, the detail page markup is searched by
//! an ordered table of pure strategies. The first strategy yielding a usable
//! URL wins.

use super::network::transport_kind;
use super::{DiscoveryStrategy, StreamCandidate, TransportKind};
use crate::utils::url::absolutize;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Parsed detail page
pub struct Markup {
    document: Html,
    source: String,
    scripts: Vec<String>,
}

impl Markup {
    pub fn parse(raw: &str) -> Self {
        let document = Html::parse_document(raw);
        let scripts = document
            .select(&INLINE_SCRIPT_SELECTOR)
            .filter(|script| script.value().attr("src").is_none())
            .map(|script| script.text().collect::<String>())
            .filter(|text| !text.trim().is_empty())
            .collect();
        Self {
            document,
            source: raw.replace("\\/", "/"),
            scripts,
        }
    }
}

pub type Strategy = fn(&Markup) -> Option<String>;

/// Fallback strategies in priority order
pub const STRATEGIES: &[(DiscoveryStrategy, Strategy)] = &[
    (DiscoveryStrategy::MediaElement, media_element_src),
    (DiscoveryStrategy::Iframe, iframe_src),
    (DiscoveryStrategy::ScriptPlaylist, script_playlist),
    (DiscoveryStrategy::ScriptFile, script_single_file),
    (DiscoveryStrategy::DataAttribute, data_attribute),
    (DiscoveryStrategy::Keyword, keyword_scan),
];

const EXCLUDED_FRAME_HOSTS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "disqus.com",
    "youtube.com",
    "googletagmanager.com",
    "google-analytics.com",
    "doubleclick.net",
    "googlesyndication.com",
];

static INLINE_SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("Invalid script selector"));

static MEDIA_ELEMENT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("video[src], audio[src], video source[src], audio source[src]")
        .expect("Invalid media element selector")
});

static IFRAME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("iframe[src]").expect("Invalid iframe selector"));

const DATA_ATTRIBUTES: &[&str] = &[
    "data-src",
    "data-video",
    "data-url",
    "data-hls",
    "data-file",
    "data-stream",
];

static DATA_ATTRIBUTE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-src], [data-video], [data-url], [data-hls], [data-file], [data-stream]")
        .expect("Invalid data attribute selector")
});

static KEYED_PLAYLIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)["']?(?:file|src|source|hls|playlist|stream|url|video)["']?\s*[:=]\s*["']([^"'\s]+?\.m3u8[^"'\s]*)["']"#,
    )
    .expect("Invalid keyed playlist regex")
});

static BARE_PLAYLIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']([^"'\s]+?\.m3u8[^"'\s]*)["']"#).expect("Invalid bare playlist regex")
});

static KEYED_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)["']?(?:file|src|source|stream|url|video|mp4)["']?\s*[:=]\s*["']([^"'\s]+?\.(?:mp4|webm|m4v)[^"'\s]*)["']"#,
    )
    .expect("Invalid keyed file regex")
});

static BARE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']([^"'\s]+?\.(?:mp4|webm|m4v)[^"'\s]*)["']"#).expect("Invalid bare file regex")
});

static MEDIA_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(?:m3u8|mp4|webm|m4v)(?:$|[?#])").expect("Invalid media extension regex")
});

static KEYWORD_MEDIA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:https?:)?//[^"'\s<>]*(?:pkflx|cdn|hls|media|stream|video)[^"'\s<>]*\.(?:m3u8|mp4|webm|m4v)(?:\?[^"'\s<>]*)?"#,
    )
    .expect("Invalid keyword regex")
});

fn usable(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.starts_with("blob:") && !value.starts_with("data:")
}

/// `src` of a `<video>`/`<audio>` element or one of its `<source>` children
pub fn media_element_src(markup: &Markup) -> Option<String> {
    markup
        .document
        .select(&MEDIA_ELEMENT_SELECTOR)
        .filter_map(|element| element.value().attr("src"))
        .find(|src| usable(src))
        .map(str::to_string)
}

/// `src` of an embedded frame that is not a social or analytics widget
pub fn iframe_src(markup: &Markup) -> Option<String> {
    markup
        .document
        .select(&IFRAME_SELECTOR)
        .filter_map(|frame| frame.value().attr("src"))
        .filter(|src| usable(src))
        .find(|src| {
            let lower = src.to_ascii_lowercase();
            !EXCLUDED_FRAME_HOSTS.iter().any(|host| lower.contains(host))
        })
        .map(str::to_string)
}

fn first_script_match(markup: &Markup, keyed: &Regex, bare: &Regex) -> Option<String> {
    [keyed, bare].into_iter().find_map(|pattern| {
        markup.scripts.iter().find_map(|script| {
            pattern
                .captures_iter(script)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str())
                .find(|url| usable(url))
                .map(str::to_string)
        })
    })
}

/// Playlist URL in an inline script, key-labelled assignments first
pub fn script_playlist(markup: &Markup) -> Option<String> {
    first_script_match(markup, &KEYED_PLAYLIST, &BARE_PLAYLIST)
}

/// Single-file media URL in an inline script, key-labelled assignments first
pub fn script_single_file(markup: &Markup) -> Option<String> {
    first_script_match(markup, &KEYED_FILE, &BARE_FILE)
}

/// Media URL held in a `data-*` attribute
pub fn data_attribute(markup: &Markup) -> Option<String> {
    markup
        .document
        .select(&DATA_ATTRIBUTE_SELECTOR)
        .flat_map(|element| {
            DATA_ATTRIBUTES
                .iter()
                .filter_map(move |attr| element.value().attr(attr))
        })
        .find(|value| usable(value) && MEDIA_EXTENSION.is_match(value))
        .map(str::to_string)
}

/// Any CDN or media-looking URL with a media extension anywhere in the page
pub fn keyword_scan(markup: &Markup) -> Option<String> {
    KEYWORD_MEDIA_URL
        .find(&markup.source)
        .map(|m| m.as_str().to_string())
}

/// Run the strategy table over `raw` markup. URLs are absolutized against
/// `base`; anything that does not resolve to an HTTP URL is skipped.
pub fn discover(raw: &str, base: &Url) -> Option<StreamCandidate> {
    let markup = Markup::parse(raw);

    STRATEGIES.iter().find_map(|(strategy, find)| {
        let found = find(&markup)?;
        let url = absolutize(base, &found)?;
        let kind = Url::parse(&url)
            .ok()
            .and_then(|parsed| transport_kind(&parsed))
            .unwrap_or(TransportKind::SingleFile);
        Some(StreamCandidate {
            url,
            kind,
            strategy: *strategy,
        })
    })
}
