//! Store collaborator interface.
//!
//! The locking engine never touches resource content. Method handlers only
//! need existence checks, folder/resource creation, and the two flags that
//! drive null-resource locking, all scoped to a [`Transaction`].

mod memory;

pub use memory::MemoryStore;

use crate::error::StoreResult;

/// Execution context for one request.
///
/// Handlers begin a transaction before touching the store and either commit
/// or roll it back before responding. The id also tags log output of the
/// lock table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: u64,
    principal: Option<String>,
}

impl Transaction {
    /// Create a transaction context.
    pub fn new(id: u64, principal: Option<String>) -> Self {
        Self { id, principal }
    }

    /// The transaction id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The authenticated principal, if any.
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }
}

/// State of a stored object as seen by the locking layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredObject {
    folder: bool,
    null_resource: bool,
}

impl StoredObject {
    /// A regular resource.
    pub fn resource() -> Self {
        Self {
            folder: false,
            null_resource: false,
        }
    }

    /// A folder (collection).
    pub fn folder() -> Self {
        Self {
            folder: true,
            null_resource: false,
        }
    }

    /// Returns true for a folder.
    pub fn is_folder(&self) -> bool {
        self.folder
    }

    /// Returns true for a non-folder object.
    pub fn is_resource(&self) -> bool {
        !self.folder
    }

    /// Returns true for a placeholder created by a null-resource lock.
    pub fn is_null_resource(&self) -> bool {
        self.null_resource
    }

    /// Set or clear the null-resource flag.
    pub fn set_null_resource(&mut self, null_resource: bool) {
        self.null_resource = null_resource;
    }

    /// Turn the object into a folder or back into a resource.
    pub fn set_folder(&mut self, folder: bool) {
        self.folder = folder;
    }
}

/// Hierarchical resource store consumed by the method handlers.
///
/// Objects are addressed by normalized paths (see [`crate::path`]).
/// Implementations must be thread-safe; the lock table, not the store, is
/// responsible for serializing conflicting requests.
pub trait WebDavStore: Send + Sync {
    /// Start a transaction for one request.
    fn begin(&self, principal: Option<&str>) -> StoreResult<Transaction>;

    /// Make the transaction's changes permanent.
    fn commit(&self, tx: &Transaction) -> StoreResult<()>;

    /// Undo every change made in the transaction.
    fn rollback(&self, tx: &Transaction) -> StoreResult<()>;

    /// Look up an object; `None` if nothing exists at `path`.
    fn get_stored_object(&self, tx: &Transaction, path: &str) -> StoreResult<Option<StoredObject>>;

    /// Create a folder. The parent must be an existing folder.
    fn create_folder(&self, tx: &Transaction, path: &str) -> StoreResult<()>;

    /// Create an empty resource. The parent must be an existing folder.
    fn create_resource(&self, tx: &Transaction, path: &str) -> StoreResult<()>;

    /// Set or clear the null-resource flag of an existing object.
    fn set_null_resource(&self, tx: &Transaction, path: &str, null_resource: bool)
    -> StoreResult<()>;

    /// Mark an existing object as a folder or a resource.
    fn set_folder(&self, tx: &Transaction, path: &str, folder: bool) -> StoreResult<()>;

    /// Remove an object and everything below it.
    fn remove_object(&self, tx: &Transaction, path: &str) -> StoreResult<()>;
}
