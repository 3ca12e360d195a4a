//! Manifest proxy against a mock CDN

use pokeflix_resolver::{
    ContentKind, Error,
    cache::TtlCache,
    config::ManifestSettings,
    manifest::ManifestProxy,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MASTER: &str = "#EXTM3U
#EXT-X-VERSION:6
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aud\",NAME=\"English\",LANGUAGE=\"en\",DEFAULT=YES,URI=\"audio/en.m3u8\"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aud\",NAME=\"Japanese\",LANGUAGE=\"ja\",URI=\"audio/ja.m3u8\"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID=\"subs\",NAME=\"Spanish\",LANGUAGE=\"es\",URI=\"subs/es.m3u8\"
#EXT-X-STREAM-INF:BANDWIDTH=2000000,AUDIO=\"aud\",SUBTITLES=\"subs\"
720p/index.m3u8
";

fn proxy() -> ManifestProxy {
    let cache = Arc::new(TtlCache::new("manifests", Duration::from_secs(3600), 16));
    ManifestProxy::new(cache, ManifestSettings::default()).expect("proxy")
}

async fn cdn_serving(route: &str, body: &str, expected_hits: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_hits)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_series_manifest_is_filtered_and_absolutized() {
    let server = cdn_serving("/hls/01-indigo-league/01/playlist.m3u8", MASTER, 1).await;
    let url = format!("{}/hls/01-indigo-league/01/playlist.m3u8", server.uri());
    let base = format!("{}/hls/01-indigo-league/01", server.uri());

    let filtered = proxy()
        .fetch_filtered(&url, ContentKind::Series)
        .await
        .expect("filtered manifest");

    let expected = format!(
        "#EXTM3U
#EXT-X-VERSION:6
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aud\",NAME=\"English\",LANGUAGE=\"en\",DEFAULT=YES,URI=\"{base}/audio/en.m3u8\"
#EXT-X-STREAM-INF:BANDWIDTH=2000000,AUDIO=\"aud\",SUBTITLES=\"subs\"
{base}/720p/index.m3u8
"
    );
    assert_eq!(filtered, expected);
}

#[tokio::test]
async fn test_movie_manifest_keeps_original_audio() {
    let server = cdn_serving("/hls/movies/01/playlist.m3u8", MASTER, 1).await;
    let url = format!("{}/hls/movies/01/playlist.m3u8", server.uri());

    let filtered = proxy()
        .fetch_filtered(&url, ContentKind::Movie)
        .await
        .expect("filtered manifest");

    assert!(filtered.contains("LANGUAGE=\"ja\""));
    assert!(filtered.contains("LANGUAGE=\"en\""));
    assert!(!filtered.contains("LANGUAGE=\"es\""));
}

#[tokio::test]
async fn test_repeated_requests_are_served_from_cache() {
    let server = cdn_serving("/hls/movies/02/playlist.m3u8", MASTER, 1).await;
    let url = format!("{}/hls/movies/02/playlist.m3u8", server.uri());
    let proxy = proxy();

    let first = proxy.fetch_filtered(&url, ContentKind::Movie).await.unwrap();
    let second = proxy
        .fetch_filtered(&format!("{}?token=abc", url), ContentKind::Movie)
        .await
        .unwrap();

    assert_eq!(first, second);
    // MockServer verifies the single upstream hit on drop
}

#[tokio::test]
async fn test_upstream_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let url = format!("{}/hls/missing/playlist.m3u8", server.uri());

    let err = proxy()
        .fetch_filtered(&url, ContentKind::Series)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Upstream { status: 404, .. }));
    assert_eq!(err.kind(), "upstream");
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MASTER))
        .mount(&server)
        .await;
    let url = format!("{}/hls/movies/03/playlist.m3u8", server.uri());
    let proxy = proxy();

    assert!(proxy.fetch_filtered(&url, ContentKind::Movie).await.is_err());
    assert!(proxy.fetch_filtered(&url, ContentKind::Movie).await.is_ok());
}

#[tokio::test]
async fn test_invalid_url_is_rejected() {
    let err = proxy()
        .fetch_filtered("not a url", ContentKind::Series)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "url");
}
