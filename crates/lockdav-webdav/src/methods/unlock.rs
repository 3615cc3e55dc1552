//! UNLOCK: release a lock by token.

use super::DavHandler;
use crate::error::{empty, WebDavError, WebDavResult};
use crate::headers;
use crate::request::DavRequest;
use bytes::Bytes;
use http::{Response, StatusCode};
use lockdav_core::Transaction;
use tracing::{debug, instrument};

impl DavHandler {
    /// Releases every owner of the lock named by the `Lock-Token` header.
    ///
    /// The lock must apply to the request path. A null-resource placeholder
    /// is removed together with its lock.
    #[instrument(level = "debug", skip_all, fields(path = %req.path(), tx = tx.id()))]
    pub(super) fn unlock(
        &self,
        tx: &Transaction,
        req: &DavRequest,
    ) -> WebDavResult<Response<Bytes>> {
        let path = req.path();
        if self.read_only {
            return Err(WebDavError::Forbidden(format!(
                "read-only server: UNLOCK {path}"
            )));
        }

        let token = headers::lock_token(req.headers()).ok_or_else(|| {
            WebDavError::BadRequest("missing or malformed Lock-Token header".to_string())
        })?;

        let temp_owner = Self::temp_owner("UNLOCK", tx);
        let _guard = self
            .locks
            .temporary_guard(tx, path, &temp_owner)
            .ok_or_else(|| WebDavError::TemporaryLockUnavailable {
                path: path.to_string(),
            })?;

        let lock = self
            .locks
            .get_locked_object_by_id(&token)
            .filter(|lo| lo.covers(path))
            .ok_or_else(|| WebDavError::Conflict(format!("{token} does not lock {path}")))?;

        // Store first: if it fails the transaction rolls back and the lock stays
        let placeholder = self
            .store
            .get_stored_object(tx, lock.path())?
            .is_some_and(|so| so.is_null_resource());
        if placeholder {
            debug!(lock_path = lock.path(), "removing null-resource placeholder");
            self.store.remove_object(tx, lock.path())?;
        }

        for owner in lock.owners() {
            self.locks.unlock(tx, lock.token(), owner)?;
        }
        Ok(empty(StatusCode::NO_CONTENT))
    }
}
