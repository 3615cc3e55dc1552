//! WebDAV locking protocol layer for lockdav.
//!
//! This crate puts the [`lockdav_core`] lock engine behind HTTP. It answers
//! the class 2 methods a WebDAV client needs to coordinate writers:
//!
//! - `LOCK` - new locks, refreshes and null-resource locks
//! - `UNLOCK` - release by `Lock-Token`
//! - `MKCOL` - collection creation, including locked null resources
//! - `OPTIONS` - `DAV: 1, 2` capability and `Allow` discovery
//!
//! Every request runs inside a store transaction and a request-scoped
//! temporary lock on its path, so the multi-step LOCK sequence (check,
//! create placeholder, grant) cannot interleave with another request on the
//! same path.
//!
//! # Client workarounds
//!
//! Mac OS X Finder sends exclusive LOCK requests without a body and then
//! locks the same path again from another connection. Such requests are
//! granted as shared locks with a generated owner. Transmit gets `204 No
//! Content` for null-resource locks.
//!
//! # Example
//!
//! ```no_run
//! use lockdav_core::{MemoryStore, ResourceLocks};
//! use lockdav_webdav::{DavHandler, ServerConfig, WebDavServer};
//! use std::sync::Arc;
//!
//! # async fn run() -> std::io::Result<()> {
//! let config = ServerConfig::default().port(8080);
//! let locks = Arc::new(ResourceLocks::new(config.locks.clone()));
//! let handler = DavHandler::new(Arc::new(MemoryStore::new()), locks, config.read_only);
//!
//! let server = WebDavServer::start(handler, &config).await?;
//! println!("Serving on {}", server.url());
//! # server.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//!
//! By default, the server binds to localhost (127.0.0.1) only.

pub mod config;
mod error;
pub mod headers;
mod methods;
pub mod quirks;
pub mod request;
mod server;
pub mod xml;

pub use config::ServerConfig;
pub use error::{WebDavError, WebDavResult};
pub use methods::{allowed_methods, DavHandler};
pub use server::WebDavServer;
