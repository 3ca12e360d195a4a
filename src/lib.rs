//! Pokeflix resolver
//!
//! Resolves episode lists, direct stream URLs and language-filtered HLS
//! manifests for content hosted on a site built for browsers, not programs.
//!
//! # Architecture
//!
//! - [`pool`]: bounded, FIFO pool of headless-browser session slots
//! - [`cache`]: TTL-expiring, insertion-order-bounded memo stores
//! - [`browser`]: automation seam, Chromium backend, challenge-aware page fetch
//! - [`resolver`]: episode-list reconciliation and stream discovery
//! - [`manifest`]: master playlist filtering and proxying
//! - [`server`] / [`cli`]: HTTP and command line front-ends
//!
//! # Usage
//!
//! ```bash
//! pokeflix-resolver serve --port 7515
//! pokeflix-resolver episodes pokeflix-s01
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use pokeflix_resolver::{Catalog, ContentResolver, Settings};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let resolver = ContentResolver::new(Settings::default())?;
//! let catalog = Catalog::builtin();
//! if let Some(series) = catalog.find_series("pokeflix-s01") {
//!     let episodes = resolver.resolve_episodes(series).await;
//!     println!("{} episodes", episodes.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod pool;
pub mod resolver;
pub mod server;
pub mod types;
pub mod utils;

pub use catalog::{Catalog, MovieDescriptor, SeriesDescriptor};
pub use config::Settings;
pub use error::{Error, Result};
pub use manifest::ContentKind;
pub use resolver::{ContentResolver, EpisodeRecord, ResolvedStream, StreamResolution};
pub use types::{ErrorResponse, PingResponse};
