//! URL helpers shared by the resolvers and the manifest filter

use url::Url;

/// Cache key for a page URL: fragment dropped, trailing slash trimmed, scheme
/// and host lower-cased. Unparseable input is used trimmed as-is.
pub fn normalize_cache_key(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            let path = url.path().to_string();
            if path.len() > 1 && path.ends_with('/') {
                url.set_path(path.trim_end_matches('/'));
            }
            url.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

/// Resolve a URL found in markup or a playlist against `base`. Handles
/// absolute, protocol-relative (`//host/x`), root-relative (`/x`) and
/// document-relative forms. Script-escaped slashes (`\/`) and `&amp;` are
/// unescaped first. Non-HTTP results yield `None`.
pub fn absolutize(base: &Url, raw: &str) -> Option<String> {
    let cleaned = raw.trim().replace("\\/", "/").replace("&amp;", "&");
    if cleaned.is_empty() {
        return None;
    }
    let lower = cleaned.to_ascii_lowercase();
    if ["data:", "blob:", "javascript:", "about:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let resolved = base.join(&cleaned).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Whether the URL's host equals one of `suffixes` or is a subdomain of one
pub fn host_matches(url: &Url, suffixes: &[String]) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    suffixes.iter().any(|suffix| {
        let suffix = suffix.trim_start_matches('.').to_ascii_lowercase();
        host == suffix || host.ends_with(&format!(".{suffix}"))
    })
}

/// Lower-cased extension of the last path segment, query ignored
pub fn path_extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let (_, ext) = segment.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}
