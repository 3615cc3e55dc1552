//! The lock table.
//!
//! All state sits behind one [`parking_lot::Mutex`], so every conflict check
//! and the insert that follows it happen as a single critical section. No
//! operation blocks on another lock holder: acquisitions that would conflict
//! return [`LockError::Conflict`] immediately and callers decide whether to
//! retry.
//!
//! # Index layout
//!
//! Records are keyed by normalized path in a `BTreeMap`. Ancestors are found
//! by walking [`parent_path`](crate::path::parent_path) upwards; descendants
//! are the contiguous key range starting with `"{path}/"`. A second map
//! resolves tokens to paths.

use crate::config::LockConfig;
use crate::error::{LockError, LockResult};
use crate::metrics::LockMetrics;
use crate::path::{ancestors, descendant_prefix};
use crate::record::{Depth, LockScope, LockType, LockedObject};
use crate::store::Transaction;
use crate::token::generate_token;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// One family of locks (durable or temporary).
#[derive(Debug, Default)]
struct LockIndex {
    by_path: BTreeMap<String, LockedObject>,
    by_token: HashMap<String, String>,
}

impl LockIndex {
    fn live(&self, path: &str, now: Instant) -> Option<&LockedObject> {
        self.by_path.get(path).filter(|lo| !lo.is_expired(now))
    }

    fn live_by_token(&self, token: &str, now: Instant) -> Option<&LockedObject> {
        self.by_token
            .get(token)
            .and_then(|path| self.live(path, now))
            .filter(|lo| lo.token == token)
    }

    /// Live records strictly below `path`.
    fn live_descendants<'a>(
        &'a self,
        path: &str,
        now: Instant,
    ) -> impl Iterator<Item = &'a LockedObject> + 'a {
        let prefix = descendant_prefix(path);
        let start = prefix.clone();
        self.by_path
            .range::<str, _>((Bound::Excluded(start.as_str()), Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .map(|(_, lo)| lo)
            .filter(move |lo| !lo.is_expired(now))
    }

    /// Live records whose scope reaches `path`: its own record plus every
    /// depth-infinity record on an ancestor. Nearest first.
    fn covering(&self, path: &str, now: Instant) -> Vec<&LockedObject> {
        let own = self.live(path, now);
        let inherited = ancestors(path)
            .filter_map(|ancestor| self.live(ancestor, now))
            .filter(|lo| lo.depth == Depth::Infinity);
        own.into_iter().chain(inherited).collect()
    }

    /// Finds the first live lock that prevents granting `scope`/`depth` on
    /// `path` to `owner`.
    fn find_conflict(
        &self,
        path: &str,
        scope: LockScope,
        depth: Depth,
        now: Instant,
    ) -> Option<&LockedObject> {
        let exclusive = scope == LockScope::Exclusive;
        let blocks = |lo: &&LockedObject| exclusive || lo.is_exclusive();

        if let Some(existing) = self.covering(path, now).into_iter().find(blocks) {
            return Some(existing);
        }
        if depth == Depth::Infinity {
            return self.live_descendants(path, now).find(|lo| blocks(lo));
        }
        None
    }

    fn remove(&mut self, path: &str) -> Option<LockedObject> {
        let removed = self.by_path.remove(path)?;
        self.by_token.remove(&removed.token);
        Some(removed)
    }

    fn fresh_token(&self) -> String {
        loop {
            let token = generate_token();
            if !self.by_token.contains_key(&token) {
                return token;
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn acquire(
        &mut self,
        path: &str,
        owner: &str,
        scope: LockScope,
        lock_type: LockType,
        depth: Depth,
        timeout: Duration,
        temporary: bool,
        now: Instant,
    ) -> LockResult<LockedObject> {
        if self.by_path.get(path).is_some_and(|lo| lo.is_expired(now)) {
            self.remove(path);
        }

        if let Some(blocking) = self.find_conflict(path, scope, depth, now) {
            return Err(LockError::Conflict {
                path: path.to_string(),
                blocking_path: blocking.path.clone(),
            });
        }

        let expires_at = now + timeout;
        if let Some(existing) = self.by_path.get_mut(path) {
            // Only a shared record can survive the conflict check
            existing.add_owner(owner);
            existing.depth = existing.depth.max(depth);
            existing.expires_at = existing.expires_at.max(expires_at);
            return Ok(existing.clone());
        }

        let record = LockedObject {
            token: self.fresh_token(),
            path: path.to_string(),
            scope,
            lock_type,
            depth,
            owners: vec![owner.to_string()],
            expires_at,
            temporary,
        };
        self.by_token.insert(record.token.clone(), path.to_string());
        self.by_path.insert(path.to_string(), record.clone());
        Ok(record)
    }

    fn release_owner(&mut self, path: &str, owner: &str) -> bool {
        let Some(record) = self.by_path.get_mut(path) else {
            return false;
        };
        if !record.remove_owner(owner) {
            return false;
        }
        if record.owners.is_empty() {
            self.remove(path);
        }
        true
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .by_path
            .iter()
            .filter(|(_, lo)| lo.is_expired(now))
            .map(|(path, _)| path.clone())
            .collect();
        for path in &expired {
            self.remove(path);
        }
        expired.len()
    }
}

#[derive(Debug, Default)]
struct LockState {
    durable: LockIndex,
    temporary: LockIndex,
}

/// Concurrent registry of resource locks.
///
/// Share it between request handlers with an `Arc`; every method takes
/// `&self`.
///
/// # Example
///
/// ```
/// use lockdav_core::{Depth, LockConfig, ResourceLocks, Transaction};
/// use std::time::Duration;
///
/// let locks = ResourceLocks::new(LockConfig::default());
/// let tx = Transaction::new(1, None);
/// let ttl = Duration::from_secs(60);
///
/// locks.shared_lock(&tx, "/a", "alice", Depth::Zero, ttl).unwrap();
/// locks.shared_lock(&tx, "/a", "bob", Depth::Zero, ttl).unwrap();
///
/// let lo = locks.get_locked_object_by_path("/a").unwrap();
/// assert_eq!(lo.owners(), ["alice", "bob"]);
/// assert!(locks.exclusive_lock(&tx, "/a", "carol", Depth::Zero, ttl).is_err());
/// ```
#[derive(Debug)]
pub struct ResourceLocks {
    config: LockConfig,
    state: Mutex<LockState>,
    metrics: LockMetrics,
}

impl Default for ResourceLocks {
    fn default() -> Self {
        Self::new(LockConfig::default())
    }
}

impl ResourceLocks {
    /// Create an empty lock table.
    pub fn new(config: LockConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LockState::default()),
            metrics: LockMetrics::new(),
        }
    }

    /// The duration configuration.
    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Activity counters.
    pub fn metrics(&self) -> &LockMetrics {
        &self.metrics
    }

    /// Try to take a temporary lock that serializes a multi-step operation.
    ///
    /// Temporary locks are exclusive among themselves and ignore durable
    /// locks. Returns false immediately if another temporary lock conflicts.
    pub fn lock_temporary(
        &self,
        tx: &Transaction,
        path: &str,
        owner: &str,
        depth: Depth,
        timeout: Duration,
    ) -> bool {
        let now = Instant::now();
        let granted = self
            .state
            .lock()
            .temporary
            .acquire(
                path,
                owner,
                LockScope::Exclusive,
                LockType::Read,
                depth,
                timeout,
                true,
                now,
            )
            .is_ok();
        self.metrics.record_temporary(granted);
        trace!(tx = tx.id(), path, owner, granted, "temporary lock");
        granted
    }

    /// Take a depth-0 temporary lock for the configured lifetime and return a
    /// guard that releases it on drop.
    ///
    /// The guard is the only safe way to hold a temporary lock across code
    /// that may fail: it runs on early returns, `?` propagation and unwinding.
    pub fn temporary_guard(
        &self,
        tx: &Transaction,
        path: &str,
        owner: &str,
    ) -> Option<TempLockGuard<'_>> {
        if !self.lock_temporary(tx, path, owner, Depth::Zero, self.config.temp_timeout) {
            return None;
        }
        Some(TempLockGuard {
            locks: self,
            tx_id: tx.id(),
            path: path.to_string(),
            owner: owner.to_string(),
        })
    }

    /// Release every temporary lock `owner` holds on `path`.
    pub fn unlock_temporary_locked_objects(&self, tx: &Transaction, path: &str, owner: &str) {
        self.release_temporary(tx.id(), path, owner);
    }

    fn release_temporary(&self, tx_id: u64, path: &str, owner: &str) {
        let released = self.state.lock().temporary.release_owner(path, owner);
        trace!(tx = tx_id, path, owner, released, "temporary unlock");
    }

    /// Try to grant an exclusive lock.
    pub fn exclusive_lock(
        &self,
        tx: &Transaction,
        path: &str,
        owner: &str,
        depth: Depth,
        timeout: Duration,
    ) -> LockResult<()> {
        self.lock(tx, path, owner, LockScope::Exclusive, depth, timeout)
    }

    /// Try to grant a shared lock. A second grant on the same path adds the
    /// owner to the existing shared record.
    pub fn shared_lock(
        &self,
        tx: &Transaction,
        path: &str,
        owner: &str,
        depth: Depth,
        timeout: Duration,
    ) -> LockResult<()> {
        self.lock(tx, path, owner, LockScope::Shared, depth, timeout)
    }

    /// Try to grant a durable write lock of the given scope.
    ///
    /// Conflicts are checked against the record on `path`, depth-infinity
    /// records on its ancestors and, for a depth-infinity request, every
    /// record below `path`. An exclusive lock anywhere in that set, or any
    /// lock at all when `scope` is exclusive, refuses the grant.
    pub fn lock(
        &self,
        tx: &Transaction,
        path: &str,
        owner: &str,
        scope: LockScope,
        depth: Depth,
        timeout: Duration,
    ) -> LockResult<()> {
        let now = Instant::now();
        let result = self.state.lock().durable.acquire(
            path,
            owner,
            scope,
            LockType::Write,
            depth,
            timeout,
            false,
            now,
        );

        match result {
            Ok(record) => {
                self.metrics.record_grant();
                debug!(
                    tx = tx.id(),
                    path,
                    owner,
                    %scope,
                    %depth,
                    token = %record.token,
                    "lock granted"
                );
                Ok(())
            }
            Err(e) => {
                self.metrics.record_conflict();
                debug!(tx = tx.id(), path, owner, %scope, error = %e, "lock refused");
                Err(e)
            }
        }
    }

    /// Remove `owner` from the lock identified by `token`.
    ///
    /// The record disappears once its last owner is removed. Fails without
    /// touching anything if the token is unknown or the owner does not hold
    /// the lock.
    pub fn unlock(&self, tx: &Transaction, token: &str, owner: &str) -> LockResult<()> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let path = match state.durable.live_by_token(token, now) {
            None => return Err(LockError::UnknownToken(token.to_string())),
            Some(lo) if !lo.has_owner(owner) => {
                return Err(LockError::NotOwner {
                    token: token.to_string(),
                    owner: owner.to_string(),
                });
            }
            Some(lo) => lo.path.clone(),
        };
        state.durable.release_owner(&path, owner);
        drop(state);

        self.metrics.record_unlock();
        debug!(tx = tx.id(), path, owner, token, "unlocked");
        Ok(())
    }

    /// Extend the lock identified by `token` by `timeout`.
    ///
    /// The new deadline is `max(now, expires_at) + timeout`, capped at
    /// `now + max_timeout`. The lock must cover `path`. Returns the updated
    /// record, or `None` if the token is unknown, expired, or belongs to a
    /// lock that does not apply to `path`.
    pub fn refresh(
        &self,
        tx: &Transaction,
        token: &str,
        path: &str,
        timeout: Duration,
    ) -> Option<LockedObject> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let lock_path = state
            .durable
            .live_by_token(token, now)
            .filter(|lo| lo.covers(path))?
            .path
            .clone();
        let record = state.durable.by_path.get_mut(&lock_path)?;

        let cap = now + self.config.max_timeout;
        record.expires_at = (record.expires_at.max(now) + timeout).min(cap);
        let refreshed = record.clone();
        drop(state);

        self.metrics.record_refresh();
        debug!(tx = tx.id(), path = %lock_path, token, "lock refreshed");
        Some(refreshed)
    }

    /// The live durable lock recorded on exactly `path`.
    pub fn get_locked_object_by_path(&self, path: &str) -> Option<LockedObject> {
        self.state.lock().durable.live(path, Instant::now()).cloned()
    }

    /// The live durable lock with the given token.
    pub fn get_locked_object_by_id(&self, token: &str) -> Option<LockedObject> {
        self.state
            .lock()
            .durable
            .live_by_token(token, Instant::now())
            .cloned()
    }

    /// The live temporary lock recorded on exactly `path`.
    pub fn get_temp_locked_object_by_path(&self, path: &str) -> Option<LockedObject> {
        self.state
            .lock()
            .temporary
            .live(path, Instant::now())
            .cloned()
    }

    /// Every live durable lock that applies to `path`, nearest first.
    pub fn locks_covering(&self, path: &str) -> Vec<LockedObject> {
        self.state
            .lock()
            .durable
            .covering(path, Instant::now())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Returns true if no lock blocks a write to `path` for a caller that
    /// presents `tokens`.
    ///
    /// Shared locks never block. An exclusive lock on `path`, or a
    /// depth-infinity exclusive lock on an ancestor, blocks unless its token
    /// is among `tokens`.
    pub fn check_locks(&self, path: &str, tokens: &[String]) -> bool {
        let state = self.state.lock();
        let blocked = state
            .durable
            .covering(path, Instant::now())
            .into_iter()
            .filter(|lo| lo.is_exclusive())
            .find(|lo| !tokens.iter().any(|t| *t == lo.token));

        if let Some(lo) = blocked {
            trace!(path, lock_path = %lo.path, "blocked by exclusive lock");
            return false;
        }
        true
    }

    /// All live durable locks, ordered by path.
    pub fn active_locks(&self) -> Vec<LockedObject> {
        let now = Instant::now();
        self.state
            .lock()
            .durable
            .by_path
            .values()
            .filter(|lo| !lo.is_expired(now))
            .cloned()
            .collect()
    }

    /// Drop expired durable and temporary records. Returns how many were
    /// removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let removed = state.durable.purge_expired(now) + state.temporary.purge_expired(now);
        drop(state);

        if removed > 0 {
            self.metrics.record_expired(removed);
            debug!(removed, "purged expired locks");
        }
        removed
    }
}

/// Releases a temporary lock when dropped.
///
/// Returned by [`ResourceLocks::temporary_guard`].
#[derive(Debug)]
#[must_use = "the temporary lock is released as soon as the guard is dropped"]
pub struct TempLockGuard<'a> {
    locks: &'a ResourceLocks,
    tx_id: u64,
    path: String,
    owner: String,
}

impl TempLockGuard<'_> {
    /// The serialized path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The temporary owner id.
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl Drop for TempLockGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            warn!(path = %self.path, "releasing temporary lock during unwind");
        }
        self.locks.release_temporary(self.tx_id, &self.path, &self.owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const TTL: Duration = Duration::from_secs(60);

    fn table() -> (ResourceLocks, Transaction) {
        (ResourceLocks::default(), Transaction::new(1, None))
    }

    #[test]
    fn test_exclusive_excludes_everything_on_path() {
        let (locks, tx) = table();
        locks.exclusive_lock(&tx, "/a", "alice", Depth::Zero, TTL).unwrap();

        assert!(locks.exclusive_lock(&tx, "/a", "bob", Depth::Zero, TTL).is_err());
        assert!(locks.shared_lock(&tx, "/a", "bob", Depth::Zero, TTL).is_err());
        // Not even the same owner may stack a second exclusive lock
        assert!(locks.exclusive_lock(&tx, "/a", "alice", Depth::Zero, TTL).is_err());
    }

    #[test]
    fn test_shared_locks_accumulate_owners() {
        let (locks, tx) = table();
        locks.shared_lock(&tx, "/a", "alice", Depth::Zero, TTL).unwrap();
        locks.shared_lock(&tx, "/a", "bob", Depth::Zero, TTL).unwrap();
        locks.shared_lock(&tx, "/a", "alice", Depth::Zero, TTL).unwrap();

        let lo = locks.get_locked_object_by_path("/a").unwrap();
        assert!(lo.is_shared());
        assert_eq!(lo.owners(), ["alice", "bob"]);
        assert_eq!(locks.active_locks().len(), 1);
    }

    #[test]
    fn test_exclusive_blocked_by_shared() {
        let (locks, tx) = table();
        locks.shared_lock(&tx, "/a", "alice", Depth::Zero, TTL).unwrap();
        let err = locks
            .exclusive_lock(&tx, "/a", "bob", Depth::Zero, TTL)
            .unwrap_err();
        assert_eq!(
            err,
            LockError::Conflict {
                path: "/a".to_string(),
                blocking_path: "/a".to_string()
            }
        );
    }

    #[test]
    fn test_depth_infinity_blocks_descendants() {
        let (locks, tx) = table();
        locks.exclusive_lock(&tx, "/c", "alice", Depth::Infinity, TTL).unwrap();

        let err = locks
            .exclusive_lock(&tx, "/c/d/e.txt", "bob", Depth::Zero, TTL)
            .unwrap_err();
        assert!(matches!(err, LockError::Conflict { ref blocking_path, .. } if blocking_path == "/c"));
        assert!(locks.shared_lock(&tx, "/c/d", "bob", Depth::Zero, TTL).is_err());
        // Siblings sharing a name prefix are unaffected
        assert!(locks.exclusive_lock(&tx, "/cd", "bob", Depth::Zero, TTL).is_ok());
    }

    #[test]
    fn test_depth_zero_ancestor_does_not_cover_children() {
        let (locks, tx) = table();
        locks.exclusive_lock(&tx, "/c", "alice", Depth::Zero, TTL).unwrap();
        assert!(locks.exclusive_lock(&tx, "/c/d", "bob", Depth::Zero, TTL).is_ok());
    }

    #[test]
    fn test_shared_infinity_ancestor_allows_shared_below() {
        let (locks, tx) = table();
        locks.shared_lock(&tx, "/c", "alice", Depth::Infinity, TTL).unwrap();
        assert!(locks.shared_lock(&tx, "/c/d", "bob", Depth::Zero, TTL).is_ok());
        assert!(locks.exclusive_lock(&tx, "/c/e", "bob", Depth::Zero, TTL).is_err());
    }

    #[test]
    fn test_infinity_request_checks_descendants() {
        let (locks, tx) = table();
        locks.shared_lock(&tx, "/c/d/e", "alice", Depth::Zero, TTL).unwrap();
        locks.shared_lock(&tx, "/f/g", "alice", Depth::Zero, TTL).unwrap();

        // Depth 0 ignores what lies below
        assert!(locks.exclusive_lock(&tx, "/f", "bob", Depth::Zero, TTL).is_ok());

        let err = locks
            .exclusive_lock(&tx, "/c", "bob", Depth::Infinity, TTL)
            .unwrap_err();
        assert!(matches!(err, LockError::Conflict { ref blocking_path, .. } if blocking_path == "/c/d/e"));
        assert!(locks.shared_lock(&tx, "/c", "bob", Depth::Infinity, TTL).is_ok());
    }

    #[test]
    fn test_root_infinity_lock_covers_everything() {
        let (locks, tx) = table();
        locks.exclusive_lock(&tx, "/", "alice", Depth::Infinity, TTL).unwrap();
        assert!(locks.shared_lock(&tx, "/x/y", "bob", Depth::Zero, TTL).is_err());
        assert!(!locks.check_locks("/x", &[]));
    }

    #[test]
    fn test_tokens_are_unique_per_record() {
        let (locks, tx) = table();
        locks.exclusive_lock(&tx, "/a", "alice", Depth::Zero, TTL).unwrap();
        locks.exclusive_lock(&tx, "/b", "alice", Depth::Zero, TTL).unwrap();
        let a = locks.get_locked_object_by_path("/a").unwrap();
        let b = locks.get_locked_object_by_path("/b").unwrap();
        assert_ne!(a.token(), b.token());
        assert_eq!(locks.get_locked_object_by_id(a.token()).unwrap().path(), "/a");
    }

    #[test]
    fn test_unlock_requires_owner() {
        let (locks, tx) = table();
        locks.exclusive_lock(&tx, "/a", "alice", Depth::Zero, TTL).unwrap();
        let token = locks.get_locked_object_by_path("/a").unwrap().token;

        assert!(matches!(
            locks.unlock(&tx, &token, "bob"),
            Err(LockError::NotOwner { .. })
        ));
        assert!(matches!(
            locks.unlock(&tx, "not-a-token", "alice"),
            Err(LockError::UnknownToken(_))
        ));
        assert!(locks.get_locked_object_by_path("/a").is_some());

        locks.unlock(&tx, &token, "alice").unwrap();
        assert!(locks.get_locked_object_by_path("/a").is_none());
        assert!(locks.get_locked_object_by_id(&token).is_none());
    }

    #[test]
    fn test_unlock_shared_keeps_remaining_owners() {
        let (locks, tx) = table();
        locks.shared_lock(&tx, "/a", "alice", Depth::Zero, TTL).unwrap();
        locks.shared_lock(&tx, "/a", "bob", Depth::Zero, TTL).unwrap();
        let token = locks.get_locked_object_by_path("/a").unwrap().token;

        locks.unlock(&tx, &token, "alice").unwrap();
        let lo = locks.get_locked_object_by_path("/a").unwrap();
        assert_eq!(lo.owners(), ["bob"]);
        assert_eq!(lo.token(), token);
    }

    #[test]
    fn test_expired_lock_is_absent() {
        let (locks, tx) = table();
        locks
            .exclusive_lock(&tx, "/a", "alice", Depth::Infinity, Duration::from_millis(1))
            .unwrap();
        let token = locks.active_locks()[0].token.clone();
        sleep(Duration::from_millis(10));

        assert!(locks.get_locked_object_by_path("/a").is_none());
        assert!(locks.get_locked_object_by_id(&token).is_none());
        assert!(locks.check_locks("/a/b", &[]));
        assert!(locks.refresh(&tx, &token, "/a", TTL).is_none());
        // The stale record does not block a new grant
        locks.exclusive_lock(&tx, "/a", "bob", Depth::Zero, TTL).unwrap();
        assert_eq!(locks.get_locked_object_by_path("/a").unwrap().owners(), ["bob"]);
    }

    #[test]
    fn test_refresh_extends_deadline() {
        let (locks, tx) = table();
        locks.exclusive_lock(&tx, "/a", "alice", Depth::Zero, TTL).unwrap();
        let before = locks.get_locked_object_by_path("/a").unwrap();

        let after = locks.refresh(&tx, before.token(), "/a", TTL).unwrap();
        assert!(after.expires_at() > before.expires_at());
        assert_eq!(after.token(), before.token());
    }

    #[test]
    fn test_refresh_is_capped_at_max() {
        let locks = ResourceLocks::new(LockConfig::default().max_timeout(Duration::from_secs(100)));
        let tx = Transaction::new(1, None);
        locks
            .exclusive_lock(&tx, "/a", "alice", Depth::Zero, Duration::from_secs(90))
            .unwrap();
        let token = locks.get_locked_object_by_path("/a").unwrap().token;

        let refreshed = locks.refresh(&tx, &token, "/a", Duration::from_secs(90)).unwrap();
        assert!(refreshed.timeout_seconds() <= 100);
    }

    #[test]
    fn test_refresh_requires_covering_lock() {
        let (locks, tx) = table();
        locks.exclusive_lock(&tx, "/a", "alice", Depth::Zero, TTL).unwrap();
        let token = locks.get_locked_object_by_path("/a").unwrap().token;
        let before = locks.get_locked_object_by_path("/a").unwrap();

        assert!(locks.refresh(&tx, &token, "/b", TTL).is_none());
        assert!(locks.refresh(&tx, &token, "/a/child", TTL).is_none());
        assert!(locks.refresh(&tx, "unknown", "/a", TTL).is_none());
        assert_eq!(locks.get_locked_object_by_path("/a").unwrap(), before);
    }

    #[test]
    fn test_check_locks_honours_tokens() {
        let (locks, tx) = table();
        locks.exclusive_lock(&tx, "/a", "alice", Depth::Infinity, TTL).unwrap();
        let token = locks.get_locked_object_by_path("/a").unwrap().token;

        assert!(!locks.check_locks("/a", &[]));
        assert!(!locks.check_locks("/a/b", &["other".to_string()]));
        assert!(locks.check_locks("/a/b", &[token]));
        assert!(locks.check_locks("/b", &[]));
    }

    #[test]
    fn test_check_locks_ignores_shared() {
        let (locks, tx) = table();
        locks.shared_lock(&tx, "/a", "alice", Depth::Infinity, TTL).unwrap();
        assert!(locks.check_locks("/a", &[]));
        assert!(locks.check_locks("/a/b", &[]));
    }

    #[test]
    fn test_locks_covering() {
        let (locks, tx) = table();
        locks.shared_lock(&tx, "/", "root", Depth::Infinity, TTL).unwrap();
        locks.shared_lock(&tx, "/a", "alice", Depth::Zero, TTL).unwrap();
        locks.shared_lock(&tx, "/a/b", "bob", Depth::Zero, TTL).unwrap();

        let paths: Vec<String> = locks
            .locks_covering("/a/b")
            .iter()
            .map(|lo| lo.path().to_string())
            .collect();
        // "/a" has depth 0 and does not reach "/a/b"
        assert_eq!(paths, ["/a/b", "/"]);
    }

    #[test]
    fn test_temporary_locks_are_separate() {
        let (locks, tx) = table();
        locks.exclusive_lock(&tx, "/a", "alice", Depth::Infinity, TTL).unwrap();

        assert!(locks.lock_temporary(&tx, "/a", "req-1", Depth::Zero, TTL));
        assert!(!locks.lock_temporary(&tx, "/a", "req-2", Depth::Zero, TTL));
        assert!(locks.get_temp_locked_object_by_path("/a").unwrap().is_temporary());
        assert_eq!(
            locks.get_temp_locked_object_by_path("/a").unwrap().lock_type(),
            LockType::Read
        );

        locks.unlock_temporary_locked_objects(&tx, "/a", "req-2");
        assert!(locks.get_temp_locked_object_by_path("/a").is_some());
        locks.unlock_temporary_locked_objects(&tx, "/a", "req-1");
        assert!(locks.get_temp_locked_object_by_path("/a").is_none());
        assert!(locks.get_locked_object_by_path("/a").is_some());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let (locks, tx) = table();
        {
            let guard = locks.temporary_guard(&tx, "/a", "req-1").unwrap();
            assert_eq!(guard.path(), "/a");
            assert!(locks.temporary_guard(&tx, "/a", "req-2").is_none());
        }
        assert!(locks.get_temp_locked_object_by_path("/a").is_none());
        assert!(locks.temporary_guard(&tx, "/a", "req-2").is_some());
    }

    #[test]
    fn test_guard_releases_on_unwind() {
        let (locks, tx) = table();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = locks.temporary_guard(&tx, "/a", "req-1").unwrap();
            panic!("store exploded");
        }));
        assert!(result.is_err());
        assert!(locks.get_temp_locked_object_by_path("/a").is_none());
    }

    #[test]
    fn test_purge_expired() {
        let (locks, tx) = table();
        let short = Duration::from_millis(1);
        locks.exclusive_lock(&tx, "/a", "alice", Depth::Zero, short).unwrap();
        locks.exclusive_lock(&tx, "/b", "alice", Depth::Zero, TTL).unwrap();
        assert!(locks.lock_temporary(&tx, "/c", "req", Depth::Zero, short));
        sleep(Duration::from_millis(10));

        assert_eq!(locks.purge_expired(), 2);
        assert_eq!(locks.active_locks().len(), 1);
        assert_eq!(locks.metrics().snapshot().expired, 2);
        assert_eq!(locks.purge_expired(), 0);
    }

    #[test]
    fn test_metrics_track_outcomes() {
        let (locks, tx) = table();
        locks.exclusive_lock(&tx, "/a", "alice", Depth::Zero, TTL).unwrap();
        let _ = locks.exclusive_lock(&tx, "/a", "bob", Depth::Zero, TTL);
        let token = locks.get_locked_object_by_path("/a").unwrap().token;
        locks.refresh(&tx, &token, "/a", TTL).unwrap();
        locks.unlock(&tx, &token, "alice").unwrap();

        let snap = locks.metrics().snapshot();
        assert_eq!(snap.grants, 1);
        assert_eq!(snap.conflicts, 1);
        assert_eq!(snap.refreshes, 1);
        assert_eq!(snap.unlocks, 1);
    }
}
