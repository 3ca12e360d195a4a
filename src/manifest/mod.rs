//! Adaptive-streaming manifest handling
//!
//! - [`filter`]: pure rewrite of an HLS master playlist
//! - [`ManifestProxy`]: upstream fetch, filter and cache

pub mod filter;
pub mod proxy;

pub use filter::{ContentKind, LanguagePolicy, filter};
pub use proxy::ManifestProxy;
