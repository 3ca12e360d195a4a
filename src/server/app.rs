//! Axum application setup
//!
//! Creates and configures the Axum application with routes and middleware.

use crate::{Result, catalog::Catalog, config::Settings, resolver::ContentResolver};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolution pipeline
    pub resolver: Arc<ContentResolver>,
    /// Series and movie descriptors
    pub catalog: Arc<Catalog>,
    /// Application settings
    pub settings: Arc<Settings>,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    /// State backed by a Chromium resolver
    pub fn new(settings: Settings, catalog: Catalog) -> Result<Self> {
        let resolver = ContentResolver::new(settings.clone())?;
        Ok(Self::with_resolver(Arc::new(resolver), catalog))
    }

    pub fn with_resolver(resolver: Arc<ContentResolver>, catalog: Catalog) -> Self {
        Self {
            settings: Arc::new(resolver.settings().clone()),
            resolver,
            catalog: Arc::new(catalog),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Create the main Axum application with routes and middleware
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(super::handlers::ping))
        .route("/episodes/{series_id}", get(super::handlers::episodes))
        .route("/stream/{slug}", get(super::handlers::stream_by_slug))
        .route(
            "/stream/movie/{movie_id}",
            get(super::handlers::stream_by_movie),
        )
        .route(
            "/stream/{series_id}/{season}/{episode}",
            get(super::handlers::stream_by_episode),
        )
        .route("/manifest/{*path}", get(super::handlers::manifest))
        .route(
            "/invalidate_caches",
            post(super::handlers::invalidate_caches),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
