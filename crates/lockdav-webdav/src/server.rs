//! HTTP server lifecycle management.
//!
//! The accept loop runs on tokio; each request body is collected and the
//! synchronous [`DavHandler`] runs on the blocking pool. A background task
//! purges expired locks at the configured interval.

use crate::config::ServerConfig;
use crate::error::empty;
use crate::methods::DavHandler;
use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// A running WebDAV server instance.
pub struct WebDavServer {
    /// The actual bound address.
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl WebDavServer {
    /// Bind the listener and start serving.
    pub async fn start(handler: DavHandler, config: &ServerConfig) -> Result<Self, std::io::Error> {
        let addr = SocketAddr::new(config.bind_address, config.port);
        let listener = TcpListener::bind(addr).await?;
        let actual_addr = listener.local_addr()?;

        info!(addr = %actual_addr, read_only = config.read_only, "Starting WebDAV server");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let sweep_interval = config.sweep_interval;

        let server_handle = tokio::spawn(async move {
            tokio::select! {
                () = run_server(listener, handler.clone()) => {
                    debug!("Server loop ended");
                }
                () = sweep_expired(handler, sweep_interval) => {
                    debug!("Sweeper ended");
                }
                _ = shutdown_rx => {
                    info!("Received shutdown signal");
                }
            }
        });

        Ok(Self {
            addr: actual_addr,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        })
    }

    /// Get the URL for this server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the server.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
        info!("WebDAV server stopped");
    }

    /// Stop the server synchronously (for use in Drop).
    fn stop_sync(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

impl Drop for WebDavServer {
    fn drop(&mut self) {
        self.stop_sync();
    }
}

/// Run the server accept loop.
async fn run_server(listener: TcpListener, handler: DavHandler) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req: Request<Incoming>| {
                        let handler = handler.clone();
                        async move { Ok::<_, Infallible>(serve(handler, req).await) }
                    });

                    if let Err(e) = auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await
                    {
                        warn!(peer = %peer_addr, error = %e, "HTTP connection error");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}

async fn serve(handler: DavHandler, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(error = %e, "failed to read request body");
            return empty(StatusCode::BAD_REQUEST).map(Full::new);
        }
    };
    let req = Request::from_parts(parts, body);

    match tokio::task::spawn_blocking(move || handler.handle(req)).await {
        Ok(resp) => resp.map(Full::new),
        Err(e) => {
            error!(error = %e, "request handler panicked");
            empty(StatusCode::INTERNAL_SERVER_ERROR).map(Full::new)
        }
    }
}

/// Purge expired locks forever.
async fn sweep_expired(handler: DavHandler, every: Duration) {
    let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let purged = handler.locks().purge_expired();
        if purged > 0 {
            debug!(purged, "purged expired locks");
        }
    }
}
