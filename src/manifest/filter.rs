//! Line-oriented HLS master playlist rewriting

use crate::config::ManifestSettings;
use crate::utils::url::absolutize;
use serde::{Deserialize, Serialize};
use url::Url;

/// What kind of title a playlist belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Series,
    Movie,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Series => "series",
            ContentKind::Movie => "movie",
        }
    }
}

/// Languages to keep. Audio matches either tag, subtitles only the primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePolicy {
    pub primary: String,
    pub secondary_audio: Option<String>,
}

impl LanguagePolicy {
    /// Movies also keep original-language audio
    pub fn for_kind(settings: &ManifestSettings, kind: ContentKind) -> Self {
        Self {
            primary: settings.primary_language.clone(),
            secondary_audio: match kind {
                ContentKind::Movie => Some(settings.original_language.clone()),
                ContentKind::Series => None,
            },
        }
    }

    fn keeps_audio(&self, language: &str) -> bool {
        language_matches(language, &self.primary)
            || self
                .secondary_audio
                .as_deref()
                .is_some_and(|secondary| language_matches(language, secondary))
    }

    fn keeps_subtitles(&self, language: &str) -> bool {
        language_matches(language, &self.primary)
    }
}

/// Case-insensitive comparison of primary subtags (`en-US` matches `en`)
pub fn language_matches(language: &str, wanted: &str) -> bool {
    fn primary(tag: &str) -> &str {
        tag.trim().split(['-', '_']).next().unwrap_or_default()
    }
    let (language, wanted) = (primary(language), primary(wanted));
    !language.is_empty() && language.eq_ignore_ascii_case(wanted)
}

/// Value of a `NAME=value` attribute on a tag line, quotes stripped
pub fn attribute<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (_, list) = line.split_once(':')?;
    split_attributes(list).into_iter().find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Split an attribute list on commas outside quoted strings
fn split_attributes(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

/// Replace the quoted `URI` attribute with its absolute form
fn absolutize_uri_attribute(line: &str, base: &Url) -> String {
    let Some(start) = line.find("URI=\"") else {
        return line.to_string();
    };
    let value_start = start + "URI=\"".len();
    let Some(len) = line[value_start..].find('"') else {
        return line.to_string();
    };
    let value = &line[value_start..value_start + len];
    match absolutize(base, value) {
        Some(absolute) => format!(
            "{}{}{}",
            &line[..value_start],
            absolute,
            &line[value_start + len..]
        ),
        None => line.to_string(),
    }
}

fn keep_media(line: &str, policy: &LanguagePolicy) -> bool {
    let Some(language) = attribute(line, "LANGUAGE") else {
        return true;
    };
    match attribute(line, "TYPE").map(str::to_ascii_uppercase).as_deref() {
        Some("AUDIO") => policy.keeps_audio(language),
        Some("SUBTITLES") => policy.keeps_subtitles(language),
        _ => true,
    }
}

/// Rewrite a master playlist.
///
/// Header and unknown directives pass through unchanged. Audio and subtitle
/// renditions outside `policy` are removed, I-frame and image (trickplay)
/// variants are removed, and every remaining URI is made absolute against
/// `base`. Line order is preserved.
pub fn filter(raw: &str, base: &Url, policy: &LanguagePolicy) -> String {
    let mut out: Vec<String> = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            out.push(line.to_string());
        } else if trimmed.starts_with("#EXT-X-MEDIA:") {
            if keep_media(trimmed, policy) {
                out.push(absolutize_uri_attribute(line, base));
            }
        } else if trimmed.starts_with("#EXT-X-I-FRAME-STREAM-INF")
            || trimmed.starts_with("#EXT-X-IMAGE-STREAM-INF")
        {
            continue;
        } else if trimmed.starts_with("#EXT-X-SESSION-DATA") && trimmed.contains("URI=\"") {
            out.push(absolutize_uri_attribute(line, base));
        } else if trimmed.starts_with('#') {
            out.push(line.to_string());
        } else {
            out.push(absolutize(base, trimmed).unwrap_or_else(|| line.to_string()));
        }
    }

    let mut rewritten = out.join("\n");
    if raw.ends_with('\n') {
        rewritten.push('\n');
    }
    rewritten
}
