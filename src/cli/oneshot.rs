//! One-shot resolutions for scripting
//!
//! Each command builds a resolver, performs a single resolution, prints the
//! result as JSON on stdout and shuts the resolver down.

use crate::{
    Settings,
    catalog::Catalog,
    manifest::ContentKind,
    resolver::ContentResolver,
    types::{EpisodesResponse, StreamResponse},
};
use anyhow::{Context, Result};
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Print the episode list of a catalog series
pub async fn run_episodes(settings: Settings, catalog: &Catalog, series_id: &str) -> Result<()> {
    let series = catalog
        .find_series(series_id)
        .with_context(|| format!("Unknown series: {}", series_id))?;

    let resolver = ContentResolver::new(settings)?;
    let episodes = resolver.resolve_episodes(series).await;
    resolver.shutdown();

    print_json(&EpisodesResponse::new(
        &series.id,
        &series.name,
        episodes.to_vec(),
    ))?;
    if episodes.is_empty() {
        anyhow::bail!("No episodes resolved for {}", series_id);
    }
    Ok(())
}

/// Print the stream resolved for a content slug
pub async fn run_stream(settings: Settings, slug: &str) -> Result<()> {
    let resolver = ContentResolver::new(settings)?;
    let resolution = resolver.resolve_stream_url(slug).await;
    resolver.shutdown();

    print_json(&StreamResponse::from_resolution(&resolution))?;
    if resolution.found().is_none() {
        anyhow::bail!("No stream resolved for {} ({})", slug, resolution.status());
    }
    Ok(())
}

/// Print the filtered form of an upstream master playlist
pub async fn run_manifest(settings: Settings, url: &str, kind: ContentKind) -> Result<()> {
    let resolver = ContentResolver::new(settings)?;
    let filtered = resolver
        .fetch_filtered_manifest(url, kind)
        .await
        .with_context(|| format!("Failed to filter manifest {}", url))?;
    resolver.shutdown();

    print!("{}", filtered);
    Ok(())
}
