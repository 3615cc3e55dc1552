//! WebDAV lock server.
//!
//! Serves LOCK, UNLOCK, MKCOL and OPTIONS over an in-memory store.
//!
//! ## Debugging with tokio-console
//!
//! Build with the `tokio-console` feature for async task introspection:
//! ```bash
//! cargo build -p lockdav-webdav --features tokio-console
//! ```
//!
//! Then run `tokio-console` in another terminal to connect (default: 127.0.0.1:6669).

use anyhow::{Context, Result};
use clap::Parser;
use lockdav_core::{MemoryStore, ResourceLocks};
use lockdav_webdav::{DavHandler, ServerConfig, WebDavServer};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
#[cfg(feature = "tokio-console")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// WebDAV server with RFC 4918 resource locking
#[derive(Parser, Debug)]
#[command(name = "lockdav", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "LOCKDAV_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (default: auto-select)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// Refuse LOCK, UNLOCK and MKCOL with 403
    #[arg(long)]
    read_only: bool,

    /// Lock duration in seconds when the client sends no Timeout header
    #[arg(long, value_name = "SECONDS")]
    default_timeout: Option<u64>,

    /// Longest lock duration in seconds
    #[arg(long, value_name = "SECONDS")]
    max_timeout: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if self.read_only {
            config.read_only = true;
        }
        if let Some(secs) = self.default_timeout {
            config.locks.default_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.max_timeout {
            config.locks.max_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    #[cfg(feature = "tokio-console")]
    {
        use std::net::SocketAddr;
        use tracing_subscriber::Layer;

        let console_port: u16 = std::env::var("TOKIO_CONSOLE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(6669);

        let console_addr: SocketAddr = ([127, 0, 0, 1], console_port).into();
        let port_available = std::net::TcpListener::bind(console_addr).is_ok();

        let fmt_filter = EnvFilter::from_default_env();

        if port_available {
            let console_layer = console_subscriber::ConsoleLayer::builder()
                .server_addr(console_addr)
                .spawn();
            tracing_subscriber::registry()
                .with(console_layer)
                .with(tracing_subscriber::fmt::layer().with_filter(fmt_filter))
                .init();
            tracing::info!(
                "tokio-console enabled, connect with: tokio-console http://127.0.0.1:{}",
                console_port
            );
        } else {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_filter(fmt_filter))
                .init();
            tracing::warn!(
                "tokio-console port {} already in use, running without console instrumentation",
                console_port
            );
        }
    }

    #[cfg(not(feature = "tokio-console"))]
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Args::parse().into_config()?;

    let locks = Arc::new(ResourceLocks::new(config.locks.clone()));
    let handler = DavHandler::new(
        Arc::new(MemoryStore::new()),
        Arc::clone(&locks),
        config.read_only,
    );

    let server = WebDavServer::start(handler, &config)
        .await
        .context("Failed to start WebDAV server")?;
    tracing::info!(url = %server.url(), "lockdav ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    server.stop().await;
    let stats = locks.metrics().snapshot();
    tracing::info!(
        grants = stats.grants,
        conflicts = stats.conflicts,
        refreshes = stats.refreshes,
        unlocks = stats.unlocks,
        expired = stats.expired,
        "lock statistics"
    );
    Ok(())
}
