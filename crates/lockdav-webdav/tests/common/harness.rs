//! Test server harness for HTTP integration tests.
//!
//! Provides a `TestServer` that runs the WebDAV server on an ephemeral port
//! over a fresh in-memory store, along with HTTP convenience methods.

use lockdav_core::{MemoryStore, ResourceLocks};
use lockdav_webdav::{DavHandler, ServerConfig, WebDavServer};
use reqwest::{Client, Method, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// Test server with HTTP client and automatic cleanup.
pub struct TestServer {
    server: WebDavServer,
    client: Client,
    /// Base URL for the server.
    pub base_url: String,
    /// The server's lock table.
    pub locks: Arc<ResourceLocks>,
}

impl TestServer {
    /// Start a server with default configuration.
    pub async fn start() -> Self {
        Self::with_config(ServerConfig::default()).await
    }

    /// Start a server with a custom configuration (port is always ephemeral).
    pub async fn with_config(config: ServerConfig) -> Self {
        let config = config.port(0);
        let locks = Arc::new(ResourceLocks::new(config.locks.clone()));
        let handler = DavHandler::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&locks),
            config.read_only,
        );

        let server = WebDavServer::start(handler, &config)
            .await
            .expect("Failed to start WebDAV server");
        let base_url = server.url();

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let test_server = Self {
            server,
            client,
            base_url,
            locks,
        };
        test_server.wait_ready().await;
        test_server
    }

    /// Wait for the server to be ready to accept connections.
    async fn wait_ready(&self) {
        for _ in 0..50 {
            if let Ok(resp) = self.client.request(Method::OPTIONS, &self.base_url).send().await
                && resp.status() == StatusCode::OK
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("Server did not become ready in time");
    }

    /// Build a full URL from a path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A request builder for any method.
    pub fn request(&self, method: &str, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(Method::from_bytes(method.as_bytes()).unwrap(), self.url(path))
    }

    // ========== HTTP Convenience Methods ==========

    /// LOCK with a lock-info body and a 10 minute timeout.
    pub async fn lock(&self, path: &str, scope: &str, owner: &str) -> Response {
        self.request("LOCK", path)
            .header("Timeout", "Second-600")
            .header("Content-Type", "text/xml")
            .body(crate::common::lock_body(scope, owner))
            .send()
            .await
            .expect("LOCK request failed")
    }

    /// UNLOCK with a `Lock-Token` header value.
    pub async fn unlock(&self, path: &str, lock_token_header: &str) -> Response {
        self.request("UNLOCK", path)
            .header("Lock-Token", lock_token_header)
            .send()
            .await
            .expect("UNLOCK request failed")
    }

    /// MKCOL (create directory).
    pub async fn mkcol(&self, path: &str) -> Response {
        self.request("MKCOL", path)
            .send()
            .await
            .expect("MKCOL request failed")
    }

    /// MKCOL and assert success.
    pub async fn mkcol_ok(&self, path: &str) {
        let resp = self.mkcol(path).await;
        let status = resp.status();
        assert_eq!(
            status,
            StatusCode::CREATED,
            "MKCOL {} failed with status {}: {}",
            path,
            status,
            resp.text().await.unwrap_or_default()
        );
    }

    /// OPTIONS.
    pub async fn options(&self, path: &str) -> Response {
        self.client
            .request(Method::OPTIONS, self.url(path))
            .send()
            .await
            .expect("OPTIONS request failed")
    }

    /// Stop the server explicitly (otherwise happens on drop).
    pub async fn stop(self) {
        self.server.stop().await;
    }
}
