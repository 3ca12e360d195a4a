//! Type definitions for the HTTP surface
//!
//! Query strings accepted and JSON bodies returned by the server.

pub mod request;
pub mod response;

pub use request::{ManifestQuery, StreamQuery};
pub use response::{EpisodesResponse, ErrorResponse, PingResponse, StreamResponse};
