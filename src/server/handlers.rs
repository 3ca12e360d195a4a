//! HTTP request handlers
//!
//! Implementation of HTTP endpoints for the resolver server.

use crate::{
    resolver::StreamResolution,
    server::app::AppState,
    types::{
        EpisodesResponse, ErrorResponse, ManifestQuery, PingResponse, StreamQuery, StreamResponse,
    },
    utils::version,
};
use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Redirect, Response},
};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn unknown_series(series_id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!("Unknown series: {}", series_id))),
    )
}

fn resolution_status(resolution: &StreamResolution) -> StatusCode {
    match resolution {
        StreamResolution::Found(_) => StatusCode::OK,
        StreamResolution::NotFound => StatusCode::NOT_FOUND,
        StreamResolution::Blocked => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Ping endpoint for health checks
///
/// GET /ping
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    let uptime = state.start_time.elapsed().as_secs();
    let stats = state.resolver.stats().await;

    tracing::debug!(
        "Ping response: uptime={}s, version={}",
        uptime,
        version::get_version()
    );
    Json(PingResponse::new(uptime, version::get_version(), stats))
}

/// Episode list of a catalog series
///
/// GET /episodes/{series_id}
///
/// An unreadable listing yields an empty list, not an error.
pub async fn episodes(
    State(state): State<AppState>,
    Path(series_id): Path<String>,
) -> Result<Json<EpisodesResponse>, ApiError> {
    let series = state
        .catalog
        .find_series(&series_id)
        .ok_or_else(|| unknown_series(&series_id))?;

    let episodes = state.resolver.resolve_episodes(series).await;
    Ok(Json(EpisodesResponse::new(
        &series.id,
        &series.name,
        episodes.to_vec(),
    )))
}

/// Direct media URL for a content slug
///
/// GET /stream/{slug}
pub async fn stream_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> (StatusCode, Json<StreamResponse>) {
    let resolution = state.resolver.resolve_stream_url(&slug).await;
    (
        resolution_status(&resolution),
        Json(StreamResponse::from_resolution(&resolution)),
    )
}

/// Media URL for an episode addressed by catalog coordinates
///
/// GET /stream/{series_id}/{season}/{episode}
///
/// Falls back to the direct CDN playlist when resolution fails, unless
/// `?strict=true` is given or the episode is outside the catalog's range.
pub async fn stream_by_episode(
    State(state): State<AppState>,
    Path((series_id, season, episode)): Path<(String, u32, u32)>,
    Query(query): Query<StreamQuery>,
) -> Result<(StatusCode, Json<StreamResponse>), ApiError> {
    let series = state
        .catalog
        .find_series(&series_id)
        .ok_or_else(|| unknown_series(&series_id))?;

    let resolution = state
        .resolver
        .resolve_episode_stream(series, season, episode)
        .await;

    if resolution.found().is_none() && !query.strict && series.has_episode(episode) {
        let url = series.cdn_playlist_url(&state.settings.site.cdn_base_url, episode);
        tracing::info!(
            key = %series_id,
            episode,
            status = resolution.status(),
            "Using direct CDN playlist"
        );
        return Ok((StatusCode::OK, Json(StreamResponse::cdn_fallback(url))));
    }

    Ok((
        resolution_status(&resolution),
        Json(StreamResponse::from_resolution(&resolution)),
    ))
}

/// CDN playlist of a catalog movie
///
/// GET /stream/movie/{movie_id}
pub async fn stream_by_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> Result<Json<StreamResponse>, ApiError> {
    let movie = state.catalog.find_movie(&movie_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Unknown movie: {}", movie_id))),
        )
    })?;

    let url = movie.cdn_playlist_url(&state.settings.site.cdn_base_url);
    tracing::debug!(key = %movie_id, "Serving movie playlist");
    Ok(Json(StreamResponse::cdn_direct(url)))
}

/// Language-filtered proxy of a CDN master playlist
///
/// GET /manifest/{*path}?kind=movie|series
///
/// On any upstream or filtering failure the client is redirected to the
/// unfiltered upstream playlist.
pub async fn manifest(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<ManifestQuery>,
) -> Response {
    let upstream = format!(
        "{}/{}",
        state.settings.site.cdn_base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );

    match state
        .resolver
        .fetch_filtered_manifest(&upstream, query.kind)
        .await
    {
        Ok(body) => (
            [(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(
                key = %upstream,
                phase = "manifest",
                kind = e.kind(),
                "Serving unfiltered upstream: {}",
                e
            );
            Redirect::temporary(&upstream).into_response()
        }
    }
}

/// Invalidate caches endpoint
///
/// POST /invalidate_caches
///
/// Clears every cache namespace and the slug index.
pub async fn invalidate_caches(State(state): State<AppState>) -> StatusCode {
    tracing::info!("Invalidating all caches");
    state.resolver.invalidate_caches().await;
    StatusCode::NO_CONTENT
}
