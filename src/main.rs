//! Pokeflix resolver binary
//!
//! Runs the HTTP server by default, or a single resolution printed as JSON.
//!
//! # Usage
//!
//! ```bash
//! pokeflix-resolver serve --port 7515 --host ::
//! pokeflix-resolver episodes pokeflix-s01
//! pokeflix-resolver stream 01-pokemon-i-choose-you
//! pokeflix-resolver manifest https://v1.pkflx.com/hls/movies/01/playlist.m3u8 --movie
//! ```

use clap::{Parser, Subcommand};
use pokeflix_resolver::{
    catalog::Catalog,
    cli::{self, oneshot, server},
    config::ConfigLoader,
    manifest::ContentKind,
};
use std::path::PathBuf;

/// Resolves episode lists, stream URLs and filtered manifests for Pokeflix
#[derive(Parser)]
#[command(name = "pokeflix-resolver", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Catalog file (JSON), replacing the built-in catalog
    #[arg(long, global = true, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Concurrent browser sessions
        #[arg(long)]
        pool_size: Option<usize>,
    },

    /// Resolve and print the episode list of a series
    Episodes {
        /// Catalog series id, e.g. pokeflix-s01
        series_id: String,
    },

    /// Resolve and print the stream URL of a content slug
    Stream {
        /// Content slug, e.g. 01-pokemon-i-choose-you
        slug: String,
    },

    /// Fetch and print a language-filtered master playlist
    Manifest {
        /// Upstream playlist URL
        url: String,

        /// Keep original-language audio as for theatrical releases
        #[arg(long)]
        movie: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = ConfigLoader::new().load(cli.config.as_deref())?;
    if cli.verbose {
        settings.logging.verbose = true;
    }
    if let Some(path) = cli.catalog.clone() {
        settings.catalog_path = Some(path);
    }
    cli::init_logging(&settings.logging);

    let catalog = Catalog::load(settings.catalog_path.as_deref())?;

    match cli.command.unwrap_or(Command::Serve {
        port: None,
        host: None,
        pool_size: None,
    }) {
        Command::Serve {
            port,
            host,
            pool_size,
        } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(size) = pool_size {
                settings.browser.pool_size = size;
            }
            settings.validate()?;
            server::run_server_mode(settings, catalog).await
        }
        Command::Episodes { series_id } => {
            oneshot::run_episodes(settings, &catalog, &series_id).await
        }
        Command::Stream { slug } => oneshot::run_stream(settings, &slug).await,
        Command::Manifest { url, movie } => {
            let kind = if movie {
                ContentKind::Movie
            } else {
                ContentKind::Series
            };
            oneshot::run_manifest(settings, &url, kind).await
        }
    }
}
