//! Resource locking engine for WebDAV servers.
//!
//! This crate tracks RFC 4918 write locks over a hierarchical resource
//! namespace and exposes the narrow store interface the protocol layer needs.
//!
//! # Components
//!
//! - [`ResourceLocks`] - Concurrent lock table (exclusive/shared, depth, expiry)
//! - [`LockedObject`] - Snapshot of a single granted lock
//! - [`TempLockGuard`] - Request-scoped temporary lock released on drop
//! - [`LockConfig`] - Default, maximum and temporary lock durations
//! - [`WebDavStore`] - Store collaborator consumed by the method handlers
//! - [`MemoryStore`] - In-memory store with per-transaction rollback
//!
//! # Locking model
//!
//! Each path has at most one durable lock record. An exclusive record has a
//! single owner; a shared record collects every owner that was granted a
//! shared lock on the path and is addressed by one token. A record with
//! [`Depth::Infinity`] covers the whole subtree for conflict checks without
//! materialising per-descendant records.
//!
//! Temporary locks live in a separate index. They serialize the multi-step
//! store sequences of a single request and never conflict with durable locks.
//!
//! Expiry is lazy: a record whose deadline has passed is treated as absent by
//! every lookup and acquisition. [`ResourceLocks::purge_expired`] reclaims the
//! memory and can be driven by a periodic task.
//!
//! # Example
//!
//! ```
//! use lockdav_core::{Depth, LockConfig, ResourceLocks, Transaction};
//! use std::time::Duration;
//!
//! let locks = ResourceLocks::new(LockConfig::default());
//! let tx = Transaction::new(1, None);
//!
//! locks
//!     .exclusive_lock(&tx, "/docs", "alice", Depth::Infinity, Duration::from_secs(600))
//!     .expect("no competing lock");
//!
//! // The depth-infinity lock blocks exclusive locks below it.
//! assert!(locks
//!     .exclusive_lock(&tx, "/docs/report.odt", "bob", Depth::Zero, Duration::from_secs(60))
//!     .is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod metrics;
pub mod path;
mod record;
pub mod store;
mod table;
pub mod timeout;
pub mod token;

pub use config::{LockConfig, DEFAULT_LOCK_TIMEOUT, MAX_LOCK_TIMEOUT, TEMP_LOCK_TIMEOUT};
pub use error::{LockError, LockResult, StoreError, StoreResult};
pub use metrics::{LockMetrics, LockMetricsSnapshot};
pub use record::{Depth, LockScope, LockType, LockedObject};
pub use store::{MemoryStore, StoredObject, Transaction, WebDavStore};
pub use table::{ResourceLocks, TempLockGuard};
