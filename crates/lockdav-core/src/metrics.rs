//! Lock table counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for lock table activity.
///
/// Thread-safe counters using atomic operations for lock-free updates.
#[derive(Debug, Default)]
pub struct LockMetrics {
    /// Durable locks granted (including shared owners added to a record)
    pub grants: AtomicU64,

    /// Acquisitions refused because of a conflicting lock
    pub conflicts: AtomicU64,

    /// Successful refreshes
    pub refreshes: AtomicU64,

    /// Owners released through unlock
    pub unlocks: AtomicU64,

    /// Temporary locks granted
    pub temporary_grants: AtomicU64,

    /// Temporary lock attempts refused
    pub temporary_conflicts: AtomicU64,

    /// Expired records reclaimed by a purge
    pub expired: AtomicU64,
}

impl LockMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_grant(&self) {
        self.grants.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_unlock(&self) {
        self.unlocks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_temporary(&self, granted: bool) {
        if granted {
            self.temporary_grants.fetch_add(1, Ordering::Relaxed);
        } else {
            self.temporary_conflicts.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_expired(&self, count: usize) {
        self.expired.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of all counters
    pub fn snapshot(&self) -> LockMetricsSnapshot {
        LockMetricsSnapshot {
            grants: self.grants.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            unlocks: self.unlocks.load(Ordering::Relaxed),
            temporary_grants: self.temporary_grants.load(Ordering::Relaxed),
            temporary_conflicts: self.temporary_conflicts.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`LockMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct LockMetricsSnapshot {
    pub grants: u64,
    pub conflicts: u64,
    pub refreshes: u64,
    pub unlocks: u64,
    pub temporary_grants: u64,
    pub temporary_conflicts: u64,
    pub expired: u64,
}

impl LockMetricsSnapshot {
    /// Fraction of durable acquisitions that were refused.
    pub fn conflict_rate(&self) -> f64 {
        let attempts = self.grants + self.conflicts;
        if attempts == 0 {
            0.0
        } else {
            self.conflicts as f64 / attempts as f64
        }
    }
}
