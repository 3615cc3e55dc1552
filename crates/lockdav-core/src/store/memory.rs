//! In-memory store with per-transaction undo journals.

use super::{StoredObject, Transaction, WebDavStore};
use crate::error::{StoreError, StoreResult};
use crate::path::{descendant_prefix, parent_path, ROOT};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// A journal entry restoring one path to its previous state.
#[derive(Debug)]
enum Undo {
    /// The path did not exist before.
    Remove(String),
    /// The path held this object before.
    Restore(String, StoredObject),
}

/// Thread-safe in-memory object tree.
///
/// Changes apply immediately and are journaled per transaction so
/// [`rollback`](WebDavStore::rollback) can restore the previous tree. The
/// root folder always exists.
///
/// # Example
///
/// ```
/// use lockdav_core::{MemoryStore, WebDavStore};
///
/// let store = MemoryStore::new();
/// let tx = store.begin(None).unwrap();
/// store.create_folder(&tx, "/docs").unwrap();
/// store.rollback(&tx).unwrap();
///
/// let tx = store.begin(None).unwrap();
/// assert!(store.get_stored_object(&tx, "/docs").unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    journals: Mutex<HashMap<u64, Vec<Undo>>>,
    next_tx: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a store holding only the root folder.
    pub fn new() -> Self {
        let mut objects = BTreeMap::new();
        objects.insert(ROOT.to_string(), StoredObject::folder());
        Self {
            objects: RwLock::new(objects),
            journals: Mutex::new(HashMap::new()),
            next_tx: AtomicU64::new(1),
        }
    }

    /// Number of objects, root included.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if only the root exists.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    fn journal(&self, tx: &Transaction, undo: Undo) -> StoreResult<()> {
        let mut journals = self.journals.lock();
        let journal = journals
            .get_mut(&tx.id())
            .ok_or(StoreError::UnknownTransaction(tx.id()))?;
        journal.push(undo);
        Ok(())
    }

    fn ensure_open(&self, tx: &Transaction) -> StoreResult<()> {
        if self.journals.lock().contains_key(&tx.id()) {
            Ok(())
        } else {
            Err(StoreError::UnknownTransaction(tx.id()))
        }
    }

    fn create(&self, tx: &Transaction, path: &str, object: StoredObject) -> StoreResult<()> {
        self.ensure_open(tx)?;
        {
            let mut objects = self.objects.write();
            if objects.contains_key(path) {
                return Err(StoreError::AlreadyExists(path.to_string()));
            }
            let parent = parent_path(path).ok_or_else(|| StoreError::AlreadyExists(path.to_string()))?;
            match objects.get(parent) {
                None => return Err(StoreError::NotFound(parent.to_string())),
                Some(p) if !p.is_folder() => return Err(StoreError::NotAFolder(parent.to_string())),
                Some(_) => {}
            }
            objects.insert(path.to_string(), object);
        }
        self.journal(tx, Undo::Remove(path.to_string()))
    }

    fn update(
        &self,
        tx: &Transaction,
        path: &str,
        change: impl FnOnce(&mut StoredObject),
    ) -> StoreResult<()> {
        self.ensure_open(tx)?;
        let previous = {
            let mut objects = self.objects.write();
            let object = objects
                .get_mut(path)
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
            let previous = *object;
            change(object);
            previous
        };
        self.journal(tx, Undo::Restore(path.to_string(), previous))
    }
}

impl WebDavStore for MemoryStore {
    fn begin(&self, principal: Option<&str>) -> StoreResult<Transaction> {
        let id = self.next_tx.fetch_add(1, Ordering::Relaxed);
        self.journals.lock().insert(id, Vec::new());
        trace!(tx = id, "begin");
        Ok(Transaction::new(id, principal.map(str::to_string)))
    }

    fn commit(&self, tx: &Transaction) -> StoreResult<()> {
        self.journals
            .lock()
            .remove(&tx.id())
            .ok_or(StoreError::UnknownTransaction(tx.id()))?;
        trace!(tx = tx.id(), "commit");
        Ok(())
    }

    fn rollback(&self, tx: &Transaction) -> StoreResult<()> {
        let journal = self
            .journals
            .lock()
            .remove(&tx.id())
            .ok_or(StoreError::UnknownTransaction(tx.id()))?;
        trace!(tx = tx.id(), changes = journal.len(), "rollback");

        let mut objects = self.objects.write();
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Remove(path) => {
                    // Keep a folder another transaction has committed children into
                    let prefix = descendant_prefix(&path);
                    let occupied = objects
                        .range::<str, _>((Bound::Excluded(prefix.as_str()), Bound::Unbounded))
                        .next()
                        .is_some_and(|(k, _)| k.starts_with(&prefix));
                    if occupied {
                        debug!(tx = tx.id(), path = %path, "rollback keeps object with foreign children");
                    } else {
                        objects.remove(&path);
                    }
                }
                Undo::Restore(path, object) => {
                    objects.insert(path, object);
                }
            }
        }
        Ok(())
    }

    fn get_stored_object(&self, tx: &Transaction, path: &str) -> StoreResult<Option<StoredObject>> {
        self.ensure_open(tx)?;
        Ok(self.objects.read().get(path).copied())
    }

    fn create_folder(&self, tx: &Transaction, path: &str) -> StoreResult<()> {
        self.create(tx, path, StoredObject::folder())
    }

    fn create_resource(&self, tx: &Transaction, path: &str) -> StoreResult<()> {
        self.create(tx, path, StoredObject::resource())
    }

    fn set_null_resource(
        &self,
        tx: &Transaction,
        path: &str,
        null_resource: bool,
    ) -> StoreResult<()> {
        self.update(tx, path, |so| so.set_null_resource(null_resource))
    }

    fn set_folder(&self, tx: &Transaction, path: &str, folder: bool) -> StoreResult<()> {
        self.update(tx, path, |so| so.set_folder(folder))
    }

    fn remove_object(&self, tx: &Transaction, path: &str) -> StoreResult<()> {
        self.ensure_open(tx)?;
        if path == ROOT {
            return Err(StoreError::AccessDenied(path.to_string()));
        }

        let removed: Vec<(String, StoredObject)> = {
            let mut objects = self.objects.write();
            let root = objects
                .remove(path)
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

            let prefix = descendant_prefix(path);
            let below: Vec<String> = objects
                .range::<str, _>((Bound::Excluded(prefix.as_str()), Bound::Unbounded))
                .take_while(|(k, _)| k.starts_with(&prefix))
                .map(|(k, _)| k.clone())
                .collect();

            let mut removed = vec![(path.to_string(), root)];
            for key in below {
                if let Some(object) = objects.remove(&key) {
                    removed.push((key, object));
                }
            }
            removed
        };

        for (path, object) in removed {
            self.journal(tx, Undo::Restore(path, object))?;
        }
        Ok(())
    }
}
