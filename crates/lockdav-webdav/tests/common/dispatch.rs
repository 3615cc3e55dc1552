//! In-process harness driving [`DavHandler`] without a socket.

use bytes::Bytes;
use http::{Method, Request, Response};
use lockdav_core::{LockConfig, MemoryStore, ResourceLocks, StoredObject, WebDavStore};
use lockdav_webdav::DavHandler;
use std::sync::Arc;

/// A handler over a fresh in-memory store.
pub struct Dav {
    pub handler: DavHandler,
    pub store: Arc<dyn WebDavStore>,
    pub locks: Arc<ResourceLocks>,
}

impl Dav {
    pub fn new() -> Self {
        Self::with_config(LockConfig::default(), false)
    }

    pub fn read_only() -> Self {
        Self::with_config(LockConfig::default(), true)
    }

    pub fn with_config(config: LockConfig, read_only: bool) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config, read_only)
    }

    pub fn with_store(store: Arc<dyn WebDavStore>, config: LockConfig, read_only: bool) -> Self {
        let locks = Arc::new(ResourceLocks::new(config));
        let handler = DavHandler::new(Arc::clone(&store), Arc::clone(&locks), read_only);
        Self {
            handler,
            store,
            locks,
        }
    }

    /// Run one request.
    pub fn send(&self, req: Request<Bytes>) -> Response<Bytes> {
        self.handler.handle(req)
    }

    /// LOCK `path` with a lock-info body.
    pub fn lock(&self, path: &str, scope: &str, owner: &str) -> Response<Bytes> {
        self.send(
            request("LOCK", path)
                .header("Timeout", "Second-600")
                .body(Bytes::from(crate::common::lock_body(scope, owner)))
                .unwrap(),
        )
    }

    /// UNLOCK `path` with a bare token.
    pub fn unlock(&self, path: &str, token: &str) -> Response<Bytes> {
        self.send(
            request("UNLOCK", path)
                .header("Lock-Token", format!("<opaquelocktoken:{token}>"))
                .body(Bytes::new())
                .unwrap(),
        )
    }

    /// MKCOL `path` with no headers.
    pub fn mkcol(&self, path: &str) -> Response<Bytes> {
        self.send(request("MKCOL", path).body(Bytes::new()).unwrap())
    }

    /// Look at `path` in a throwaway transaction.
    pub fn object(&self, path: &str) -> Option<StoredObject> {
        let tx = self.store.begin(None).unwrap();
        let so = self.store.get_stored_object(&tx, path).unwrap();
        self.store.rollback(&tx).unwrap();
        so
    }

    /// Create a committed object.
    pub fn create(&self, path: &str, folder: bool) {
        let tx = self.store.begin(None).unwrap();
        if folder {
            self.store.create_folder(&tx, path).unwrap();
        } else {
            self.store.create_resource(&tx, path).unwrap();
        }
        self.store.commit(&tx).unwrap();
    }
}

/// Request builder for a WebDAV method.
pub fn request(method: &str, path: &str) -> http::request::Builder {
    Request::builder()
        .method(Method::from_bytes(method.as_bytes()).unwrap())
        .uri(path)
}

/// Bare token from a response's `Lock-Token` header.
pub fn response_token(resp: &Response<Bytes>) -> String {
    let header = resp.headers()["lock-token"].to_str().unwrap();
    crate::common::unbracket(header)
        .trim_start_matches("opaquelocktoken:")
        .to_string()
}
