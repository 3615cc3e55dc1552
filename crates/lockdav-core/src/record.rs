//! Lock records.

use std::fmt;
use std::time::{Duration, Instant};

/// Lock scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockScope {
    /// Single owner, blocks every other lock.
    Exclusive,
    /// Any number of owners, blocks only exclusive locks.
    Shared,
}

impl LockScope {
    /// The DAV element name for this scope.
    pub fn as_str(self) -> &'static str {
        match self {
            LockScope::Exclusive => "exclusive",
            LockScope::Shared => "shared",
        }
    }
}

impl fmt::Display for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock type.
///
/// Durable client locks are write locks; the table tags its internal
/// temporary locks as read locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockType {
    /// RFC 4918 write lock.
    Write,
    /// Request-scoped serialization lock.
    Read,
}

impl LockType {
    /// The DAV element name for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            LockType::Write => "write",
            LockType::Read => "read",
        }
    }
}

/// Lock depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Depth {
    /// The named resource only.
    Zero,
    /// The resource and, for a collection, every descendant.
    Infinity,
}

impl Depth {
    /// The `Depth` header / `depth` element value.
    pub fn as_str(self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::Infinity => "infinity",
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single granted lock.
///
/// Values handed out by [`ResourceLocks`](crate::ResourceLocks) are
/// snapshots; mutating the table (refresh, unlock) never changes a copy a
/// caller already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedObject {
    pub(crate) token: String,
    pub(crate) path: String,
    pub(crate) scope: LockScope,
    pub(crate) lock_type: LockType,
    pub(crate) depth: Depth,
    pub(crate) owners: Vec<String>,
    pub(crate) expires_at: Instant,
    pub(crate) temporary: bool,
}

impl LockedObject {
    /// The opaque token identifying this lock (without URI scheme).
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The locked path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The lock scope.
    pub fn scope(&self) -> LockScope {
        self.scope
    }

    /// Returns true for an exclusive lock.
    pub fn is_exclusive(&self) -> bool {
        self.scope == LockScope::Exclusive
    }

    /// Returns true for a shared lock.
    pub fn is_shared(&self) -> bool {
        self.scope == LockScope::Shared
    }

    /// The lock type.
    pub fn lock_type(&self) -> LockType {
        self.lock_type
    }

    /// The lock depth.
    pub fn depth(&self) -> Depth {
        self.depth
    }

    /// Owners in grant order. Exclusive locks have exactly one.
    pub fn owners(&self) -> &[String] {
        &self.owners
    }

    /// Returns true if `owner` holds this lock.
    pub fn has_owner(&self, owner: &str) -> bool {
        self.owners.iter().any(|o| o == owner)
    }

    /// Absolute expiry deadline.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Returns true for a request-scoped temporary lock.
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Returns true once the deadline has passed.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry (zero once expired).
    pub fn remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    /// Remaining lifetime in whole seconds, rounded up.
    ///
    /// A lock granted for 600 seconds reports `600` for the whole of its
    /// first second, which is what clients expect to read back.
    pub fn timeout_seconds(&self) -> u64 {
        let remaining = self.remaining(Instant::now());
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    /// Returns true if this lock applies to `path` (its own path, or a
    /// descendant when the depth is infinite).
    pub fn covers(&self, path: &str) -> bool {
        self.path == path
            || (self.depth == Depth::Infinity && crate::path::is_descendant(path, &self.path))
    }

    /// Adds an owner, keeping grant order. Returns false if already present.
    pub(crate) fn add_owner(&mut self, owner: &str) -> bool {
        if self.has_owner(owner) {
            return false;
        }
        self.owners.push(owner.to_string());
        true
    }

    /// Removes an owner. Returns false if it was not present.
    pub(crate) fn remove_owner(&mut self, owner: &str) -> bool {
        let before = self.owners.len();
        self.owners.retain(|o| o != owner);
        self.owners.len() != before
    }
}
