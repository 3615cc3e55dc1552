//! Error types for the lock table and the store collaborator.
//!
//! Ordinary contention is reported through [`LockError::Conflict`] rather
//! than a panic or a generic failure, so callers can map it to `423 Locked`
//! and carry on.

use std::io;
use thiserror::Error;

/// Errors returned by lock table operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// Another lock blocks the requested operation.
    #[error("Resource is locked: {path} (blocked by lock on {blocking_path})")]
    Conflict {
        /// The path the caller tried to lock.
        path: String,
        /// The path of the lock that caused the conflict.
        blocking_path: String,
    },

    /// No live lock carries the presented token.
    #[error("Unknown or expired lock token: {0}")]
    UnknownToken(String),

    /// The lock exists but the presented owner does not hold it.
    #[error("{owner} does not own lock {token}")]
    NotOwner {
        /// The presented token.
        token: String,
        /// The presented owner.
        owner: String,
    },

    /// The path is not a valid absolute resource path.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl LockError {
    /// Returns true for ordinary contention.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LockError::Conflict { .. })
    }
}

/// Result type for lock table operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors raised by a [`WebDavStore`](crate::WebDavStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object (or a required parent) does not exist.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// An object already exists at the path.
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    /// The parent of the path is a resource, not a folder.
    #[error("Not a folder: {0}")]
    NotAFolder(String),

    /// The caller may not perform the operation.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The transaction is unknown or already finished.
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(u64),

    /// IO error from a persistent backend.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Any other backend failure.
    #[error("Store failure: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
