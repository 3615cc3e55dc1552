//! Error handling and mapping for the WebDAV protocol layer.
//!
//! Handlers return [`WebDavError`] for every non-success outcome; the
//! dispatcher turns it into a response with [`WebDavError::into_response`].

use crate::xml;
use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{Response, StatusCode};
use lockdav_core::{LockError, StoreError};
use thiserror::Error;
use tracing::error;

/// Errors that end a WebDAV request.
#[derive(Debug, Error)]
pub enum WebDavError {
    /// The server is read-only or the operation is refused.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A lock blocks the operation. Answered `423` with a multi-status body
    /// naming the path.
    #[error("Resource is locked: {path}")]
    Locked {
        /// The path reported in the multi-status body.
        path: String,
    },

    /// The request is malformed (bad header, bad path).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The lock-info body could not be understood.
    #[error("Malformed lock request body: {0}")]
    MalformedLockInfo(String),

    /// The target's parent is missing or is not a collection.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A lock token was required but is absent or unknown.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// The method cannot be applied to the target in its current state.
    #[error("Method not allowed")]
    MethodNotAllowed {
        /// Value of the `Allow` header.
        allow: String,
    },

    /// The method is not implemented by this server.
    #[error("Method not implemented: {0}")]
    NotImplemented(String),

    /// The lock table granted a lock but holds no record for it.
    #[error("Lock granted on {path} but no lock record exists")]
    LockInconsistency {
        /// The locked path.
        path: String,
    },

    /// Another request holds the temporary lock on the path.
    #[error("Temporary lock unavailable: {path}")]
    TemporaryLockUnavailable {
        /// The contended path.
        path: String,
    },

    /// Store collaborator failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Unexpected lock table failure.
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    /// Response serialization failure.
    #[error("XML error: {0}")]
    Xml(#[from] ::xml::writer::Error),

    /// Server-side failure without a more specific category.
    #[error("Server error: {0}")]
    Server(String),
}

impl WebDavError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            WebDavError::Forbidden(_) => StatusCode::FORBIDDEN,
            WebDavError::Locked { .. } => StatusCode::LOCKED,
            WebDavError::BadRequest(_) | WebDavError::MalformedLockInfo(_) => {
                StatusCode::BAD_REQUEST
            }
            WebDavError::Conflict(_) => StatusCode::CONFLICT,
            WebDavError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            WebDavError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            WebDavError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            WebDavError::Store(e) => store_error_status(e),
            WebDavError::Lock(e) => lock_error_status(e),
            WebDavError::LockInconsistency { .. }
            | WebDavError::TemporaryLockUnavailable { .. }
            | WebDavError::Xml(_)
            | WebDavError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render this error as a response.
    pub fn into_response(self) -> Response<Bytes> {
        let status = self.status();
        match &self {
            WebDavError::LockInconsistency { path } => {
                error!(path = %path, "lock engine inconsistency: granted lock has no record");
            }
            _ if status.is_server_error() => error!(error = %self, "request failed"),
            _ => {}
        }

        match self {
            WebDavError::Locked { path } => match xml::multistatus(&path, StatusCode::LOCKED) {
                Ok(body) => Response::builder()
                    .status(StatusCode::LOCKED)
                    .header(CONTENT_TYPE, xml::CONTENT_TYPE_XML)
                    .body(Bytes::from(body))
                    .unwrap_or_else(|_| empty(StatusCode::LOCKED)),
                Err(e) => {
                    error!(error = %e, "failed to render multistatus body");
                    empty(StatusCode::LOCKED)
                }
            },
            WebDavError::MethodNotAllowed { allow } => Response::builder()
                .status(status)
                .header(ALLOW, allow)
                .body(Bytes::new())
                .unwrap_or_else(|_| empty(status)),
            _ => empty(status),
        }
    }
}

fn store_error_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::AccessDenied(_) => StatusCode::FORBIDDEN,
        // A missing or non-collection ancestor while creating, or an object
        // that appeared under a concurrent request
        StoreError::NotFound(_) | StoreError::NotAFolder(_) | StoreError::AlreadyExists(_) => {
            StatusCode::CONFLICT
        }
        StoreError::UnknownTransaction(_) | StoreError::Io(_) | StoreError::Backend(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn lock_error_status(e: &LockError) -> StatusCode {
    match e {
        LockError::Conflict { .. } => StatusCode::LOCKED,
        LockError::UnknownToken(_) => StatusCode::PRECONDITION_FAILED,
        LockError::NotOwner { .. } => StatusCode::FORBIDDEN,
        LockError::InvalidPath(_) => StatusCode::BAD_REQUEST,
    }
}

/// A response with no body.
pub(crate) fn empty(status: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}

/// Result type for WebDAV handlers.
pub type WebDavResult<T> = Result<T, WebDavError>;
