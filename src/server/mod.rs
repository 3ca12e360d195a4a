//! HTTP server
//!
//! Axum router and handlers exposing the resolver over HTTP.

pub mod app;
pub mod handlers;

pub use app::{AppState, create_app};
