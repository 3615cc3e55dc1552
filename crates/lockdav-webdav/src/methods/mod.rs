//! WebDAV method handlers.
//!
//! [`DavHandler`] decodes the request, opens a store transaction, runs the
//! method handler and turns its outcome into a response. The transaction is
//! committed only when the response is a success; any other outcome rolls
//! it back so no placeholder object outlives a refused lock. A handler that
//! unwinds rolls back too, through the `Drop` of `OpenTransaction`.

mod lock;
mod mkcol;
mod options;
mod unlock;

use crate::error::{WebDavError, WebDavResult};
use crate::request::DavRequest;
use bytes::Bytes;
use http::{Request, Response};
use lockdav_core::{ResourceLocks, StoredObject, Transaction, WebDavStore};
use std::sync::Arc;
use tracing::{debug, error, info_span, warn};

/// Methods allowed on a missing path.
const ALLOW_ABSENT: &str = "OPTIONS, MKCOL, PUT, LOCK";
/// Methods allowed on a null-resource placeholder.
const ALLOW_NULL_RESOURCE: &str = "OPTIONS, MKCOL, PUT, PROPFIND, LOCK, UNLOCK";
/// Methods allowed on a resource.
const ALLOW_RESOURCE: &str =
    "OPTIONS, GET, HEAD, POST, DELETE, TRACE, PROPPATCH, COPY, MOVE, LOCK, UNLOCK, PROPFIND";
/// Methods allowed on a folder.
const ALLOW_FOLDER: &str =
    "OPTIONS, GET, HEAD, POST, DELETE, TRACE, PROPPATCH, COPY, MOVE, LOCK, UNLOCK, PROPFIND, PUT";

/// The `Allow` header value for an object in its current state.
pub fn allowed_methods(object: Option<&StoredObject>) -> &'static str {
    match object {
        None => ALLOW_ABSENT,
        Some(so) if so.is_null_resource() => ALLOW_NULL_RESOURCE,
        Some(so) if so.is_folder() => ALLOW_FOLDER,
        Some(_) => ALLOW_RESOURCE,
    }
}

/// Dispatches WebDAV requests to the method handlers.
///
/// Handlers are synchronous; the async server runs them on the blocking pool.
#[derive(Clone)]
pub struct DavHandler {
    store: Arc<dyn WebDavStore>,
    locks: Arc<ResourceLocks>,
    read_only: bool,
}

impl std::fmt::Debug for DavHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DavHandler")
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl DavHandler {
    /// Create a handler over a store and a shared lock table.
    pub fn new(store: Arc<dyn WebDavStore>, locks: Arc<ResourceLocks>, read_only: bool) -> Self {
        Self {
            store,
            locks,
            read_only,
        }
    }

    /// The lock table.
    pub fn locks(&self) -> &Arc<ResourceLocks> {
        &self.locks
    }

    /// The store.
    pub fn store(&self) -> &Arc<dyn WebDavStore> {
        &self.store
    }

    /// Handle one request.
    pub fn handle(&self, request: Request<Bytes>) -> Response<Bytes> {
        let req = match DavRequest::from_http(request) {
            Ok(req) => req,
            Err(e) => {
                debug!(error = %e, "rejecting request");
                return e.into_response();
            }
        };

        let tx = match self.store.begin(None) {
            Ok(tx) => OpenTransaction::new(self.store.as_ref(), tx),
            Err(e) => return WebDavError::from(e).into_response(),
        };

        let span = info_span!("dav", method = %req.method(), path = %req.path(), tx = tx.id());
        let _enter = span.enter();

        let response = self
            .dispatch(&tx, &req)
            .unwrap_or_else(WebDavError::into_response);
        Self::finish(tx, response)
    }

    fn dispatch(&self, tx: &Transaction, req: &DavRequest) -> WebDavResult<Response<Bytes>> {
        match req.method().as_str() {
            "LOCK" => self.lock(tx, req),
            "UNLOCK" => self.unlock(tx, req),
            "MKCOL" => self.mkcol(tx, req),
            "OPTIONS" => self.options(tx, req),
            other => Err(WebDavError::NotImplemented(other.to_string())),
        }
    }

    fn finish(mut tx: OpenTransaction<'_>, response: Response<Bytes>) -> Response<Bytes> {
        let status = response.status();
        tx.finished = true;
        let outcome = if status.is_success() {
            tx.store.commit(&tx.tx)
        } else {
            tx.store.rollback(&tx.tx)
        };

        match outcome {
            Ok(()) => {
                debug!(status = status.as_u16(), "request complete");
                response
            }
            Err(e) if status.is_success() => {
                error!(error = %e, "commit failed");
                WebDavError::from(e).into_response()
            }
            Err(e) => {
                // The request already failed; report that failure
                error!(error = %e, "rollback failed");
                response
            }
        }
    }

    /// Owner id for the temporary lock serializing this request.
    fn temp_owner(method: &str, tx: &Transaction) -> String {
        format!("{method}-{}", tx.id())
    }
}

/// A store transaction that rolls back when dropped unfinished.
struct OpenTransaction<'a> {
    store: &'a dyn WebDavStore,
    tx: Transaction,
    finished: bool,
}

impl<'a> OpenTransaction<'a> {
    fn new(store: &'a dyn WebDavStore, tx: Transaction) -> Self {
        Self {
            store,
            tx,
            finished: false,
        }
    }
}

impl std::ops::Deref for OpenTransaction<'_> {
    type Target = Transaction;

    fn deref(&self) -> &Transaction {
        &self.tx
    }
}

impl Drop for OpenTransaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(tx = self.tx.id(), "request aborted, rolling back");
        if let Err(e) = self.store.rollback(&self.tx) {
            error!(tx = self.tx.id(), error = %e, "rollback failed");
        }
    }
}
