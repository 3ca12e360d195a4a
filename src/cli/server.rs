//! Server mode CLI logic
//!
//! Contains the core logic for running the HTTP server mode.

use crate::{
    Settings,
    catalog::Catalog,
    server::app::{self, AppState},
    utils::version,
};
use anyhow::{Context, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Run the HTTP server until Ctrl-C
pub async fn run_server_mode(settings: Settings, catalog: Catalog) -> Result<()> {
    tracing::info!("Starting pokeflix-resolver v{}", version::get_version());

    let addr = parse_and_bind_address(&settings.server.host, settings.server.port).await?;
    let state = AppState::new(settings, catalog).context("Failed to build resolver")?;
    let resolver = state.resolver.clone();
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(
        "pokeflix-resolver v{} listening on {}",
        version::get_version(),
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown requested");
        })
        .await?;

    resolver.shutdown();
    Ok(())
}

/// Resolve the configured host to a socket address.
///
/// Accepts IP literals, `localhost`, and `::` (dual-stack any). When `::`
/// cannot be bound on this machine, the IPv4 any address is used instead.
pub async fn parse_and_bind_address(host: &str, port: u16) -> Result<SocketAddr> {
    let host = host.trim();

    if host == "::" {
        let addr = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port);
        return match tokio::net::TcpListener::bind(addr).await {
            Ok(_) => Ok(addr),
            Err(e) => {
                tracing::warn!(
                    "Could not listen on [::]:{} ({}), falling back to 0.0.0.0",
                    port,
                    e
                );
                Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
            }
        };
    }

    if host.eq_ignore_ascii_case("localhost") {
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port));
    }

    match host.trim_matches(['[', ']']).parse::<IpAddr>() {
        Ok(ip) => Ok(SocketAddr::new(ip, port)),
        Err(_) => anyhow::bail!(
            "Invalid host address: {}. Use an IP address, 'localhost', or '::'",
            host
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_ipv4_address() {
        let addr = parse_and_bind_address("127.0.0.1", 0).await.unwrap();
        assert_eq!(addr.ip(), IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));
    }

    #[tokio::test]
    async fn test_parse_bracketed_ipv6_address() {
        let addr = parse_and_bind_address("[::1]", 7515).await.unwrap();
        assert_eq!(addr.ip(), IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(addr.port(), 7515);
    }

    #[tokio::test]
    async fn test_parse_localhost() {
        let addr = parse_and_bind_address("LocalHost", 8080).await.unwrap();
        assert_eq!(addr.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_ipv6_any_or_fallback() {
        let addr = parse_and_bind_address("::", 0).await.unwrap();
        assert!(
            addr.ip() == IpAddr::V6(Ipv6Addr::UNSPECIFIED)
                || addr.ip() == IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        );
    }

    #[tokio::test]
    async fn test_invalid_host() {
        let error = parse_and_bind_address("pokeflix.local", 8080)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("Invalid host address: pokeflix.local"));

        assert!(parse_and_bind_address("", 8080).await.is_err());
    }
}
