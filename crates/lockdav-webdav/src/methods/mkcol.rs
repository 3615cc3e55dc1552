//! MKCOL, including conversion of null-resource placeholders.

use super::{allowed_methods, DavHandler};
use crate::error::{empty, WebDavError, WebDavResult};
use crate::request::DavRequest;
use bytes::Bytes;
use http::{Response, StatusCode};
use lockdav_core::Transaction;
use tracing::{debug, instrument};

impl DavHandler {
    #[instrument(level = "debug", skip_all, fields(path = %req.path(), tx = tx.id()))]
    pub(super) fn mkcol(&self, tx: &Transaction, req: &DavRequest) -> WebDavResult<Response<Bytes>> {
        let path = req.path();
        if self.read_only {
            return Err(WebDavError::Forbidden(format!("read-only server: MKCOL {path}")));
        }

        let Some(parent) = req.parent() else {
            let root = self.store.get_stored_object(tx, path)?;
            return Err(WebDavError::MethodNotAllowed {
                allow: allowed_methods(root.as_ref()).to_string(),
            });
        };

        let tokens = req.if_tokens();
        if !self.locks.check_locks(parent, &tokens) {
            debug!(parent, "parent is locked");
            return Err(WebDavError::Forbidden(format!("{parent} is locked")));
        }

        let temp_owner = Self::temp_owner("MKCOL", tx);
        let _guard = self
            .locks
            .temporary_guard(tx, path, &temp_owner)
            .ok_or_else(|| WebDavError::TemporaryLockUnavailable {
                path: path.to_string(),
            })?;

        let parent_so = self
            .store
            .get_stored_object(tx, parent)?
            .ok_or_else(|| WebDavError::Conflict(format!("parent {parent} does not exist")))?;
        if parent_so.is_resource() {
            return Err(WebDavError::MethodNotAllowed {
                allow: allowed_methods(Some(&parent_so)).to_string(),
            });
        }

        match self.store.get_stored_object(tx, path)? {
            None => {
                self.store.create_folder(tx, path)?;
                Ok(empty(StatusCode::CREATED))
            }
            Some(so) if so.is_null_resource() => self.convert_null_resource(tx, path, &tokens),
            Some(so) => Err(WebDavError::MethodNotAllowed {
                allow: allowed_methods(Some(&so)).to_string(),
            }),
        }
    }

    /// Turn a locked placeholder into a collection and release its lock.
    ///
    /// A mismatched token answers 423 with a multi-status body rather than
    /// 409.
    fn convert_null_resource(
        &self,
        tx: &Transaction,
        path: &str,
        tokens: &[String],
    ) -> WebDavResult<Response<Bytes>> {
        let lock = self
            .locks
            .get_locked_object_by_path(path)
            .ok_or_else(|| WebDavError::Server(format!("null resource {path} has no lock")))?;

        if tokens.is_empty() {
            return Err(WebDavError::BadRequest(format!(
                "MKCOL on locked null resource {path} without a lock token"
            )));
        }
        if !tokens.iter().any(|t| t == lock.token()) {
            return Err(WebDavError::Locked {
                path: path.to_string(),
            });
        }

        self.store.set_null_resource(tx, path, false)?;
        self.store.set_folder(tx, path, true)?;

        for owner in lock.owners() {
            self.locks.unlock(tx, lock.token(), owner)?;
        }
        debug!(token = lock.token(), "null resource converted to collection");
        Ok(empty(StatusCode::CREATED))
    }
}
