//! LOCK: new locks, refreshes and null-resource locks.

use super::DavHandler;
use crate::error::{WebDavError, WebDavResult};
use crate::headers::{self, LOCK_TOKEN};
use crate::quirks::ClientQuirks;
use crate::request::DavRequest;
use crate::xml::{self, CONTENT_TYPE_XML};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use lockdav_core::timeout::parse_timeout;
use lockdav_core::token::to_lock_token_header;
use lockdav_core::{Depth, LockScope, LockType, LockedObject, StoreError, Transaction};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument, warn};

/// Everything needed to grant a durable lock, parsed before the store is
/// touched.
#[derive(Debug)]
struct LockRequest {
    scope: LockScope,
    owner: String,
    depth: Depth,
    timeout: Duration,
}

impl DavHandler {
    #[instrument(level = "debug", skip_all, fields(path = %req.path(), tx = tx.id()))]
    pub(super) fn lock(&self, tx: &Transaction, req: &DavRequest) -> WebDavResult<Response<Bytes>> {
        let path = req.path();
        if self.read_only {
            return Err(WebDavError::Forbidden(format!("read-only server: LOCK {path}")));
        }

        let tokens = req.if_tokens();
        let refreshing = req.has_if_header();

        // A refresh validates its token itself and answers 412 on mismatch
        if !refreshing {
            let blocked = |p: &str| !self.locks.check_locks(p, &tokens);
            if blocked(path) || req.parent().is_some_and(blocked) {
                return Err(WebDavError::Locked {
                    path: path.to_string(),
                });
            }
        }

        let quirks = ClientQuirks::detect(req.user_agent(), req.body().is_empty());
        let depth = headers::parse_depth(req.header(headers::DEPTH))?;
        let timeout = parse_timeout(req.header(headers::TIMEOUT), self.locks.config());

        let temp_owner = Self::temp_owner("LOCK", tx);
        let _guard = self
            .locks
            .temporary_guard(tx, path, &temp_owner)
            .ok_or_else(|| WebDavError::TemporaryLockUnavailable {
                path: path.to_string(),
            })?;

        if refreshing {
            return self.refresh_lock(tx, path, &tokens, timeout);
        }

        let request = if quirks.mac_finder {
            debug!(user_agent = req.user_agent(), "Finder workaround: shared lock");
            LockRequest {
                scope: LockScope::Shared,
                owner: ClientQuirks::finder_owner(req.user_agent(), now_millis()),
                depth,
                timeout,
            }
        } else {
            let info = xml::parse_lock_info(req.body())?;
            if info.lock_type != LockType::Write {
                return Err(WebDavError::BadRequest(format!(
                    "unsupported lock type {}",
                    info.lock_type.as_str()
                )));
            }
            LockRequest {
                scope: info.scope,
                owner: info
                    .owner
                    .unwrap_or_else(|| fallback_owner(req.user_agent())),
                depth,
                timeout,
            }
        };

        match self.store.get_stored_object(tx, path)? {
            Some(_) => {
                let lock = self.grant(tx, path, &request)?;
                self.lock_response(tx, StatusCode::OK, &lock, &request.owner)
            }
            None => {
                let lock = self.null_resource_lock(tx, req, &request)?;
                let status = if quirks.mac_finder {
                    StatusCode::OK
                } else if quirks.transmit {
                    StatusCode::NO_CONTENT
                } else {
                    StatusCode::CREATED
                };
                self.lock_response(tx, status, &lock, &request.owner)
            }
        }
    }

    /// Extend the lock named by the first `If` token that refreshes.
    fn refresh_lock(
        &self,
        tx: &Transaction,
        path: &str,
        tokens: &[String],
        timeout: Duration,
    ) -> WebDavResult<Response<Bytes>> {
        if tokens.is_empty() {
            return Err(WebDavError::PreconditionFailed(
                "If header carries no lock token".to_string(),
            ));
        }

        let lock = tokens
            .iter()
            .find_map(|token| self.locks.refresh(tx, token, path, timeout))
            .ok_or_else(|| {
                WebDavError::PreconditionFailed(format!("no lock on {path} matches the If header"))
            })?;

        let owner = lock.owners().first().cloned().unwrap_or_default();
        lock_discovery_response(StatusCode::OK, &lock, &owner)
    }

    /// Create the placeholder for a lock on a path with no resource, then
    /// lock it.
    fn null_resource_lock(
        &self,
        tx: &Transaction,
        req: &DavRequest,
        request: &LockRequest,
    ) -> WebDavResult<LockedObject> {
        let path = req.path();
        if let Some(parent) = req.parent() {
            match self.store.get_stored_object(tx, parent)? {
                None => {
                    debug!(parent, "creating missing parent collection");
                    match self.store.create_folder(tx, parent) {
                        Ok(()) => {}
                        Err(StoreError::AlreadyExists(_)) => {
                            debug!(parent, "parent created concurrently");
                            match self.store.get_stored_object(tx, parent)? {
                                Some(so) if so.is_folder() => {}
                                _ => {
                                    return Err(WebDavError::Conflict(format!(
                                        "parent of {path} is not a collection"
                                    )));
                                }
                            }
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Some(so) if so.is_resource() => {
                    return Err(WebDavError::Conflict(format!(
                        "parent of {path} is not a collection"
                    )));
                }
                Some(_) => {}
            }
        }

        if self.store.get_stored_object(tx, path)?.is_some() {
            // Another request created it between our checks
            return Err(WebDavError::Locked {
                path: path.to_string(),
            });
        }
        self.store.create_resource(tx, path)?;
        self.store.set_null_resource(tx, path, true)?;

        self.grant(tx, path, request)
    }

    fn grant(
        &self,
        tx: &Transaction,
        path: &str,
        request: &LockRequest,
    ) -> WebDavResult<LockedObject> {
        let result = self.locks.lock(
            tx,
            path,
            &request.owner,
            request.scope,
            request.depth,
            request.timeout,
        );
        match result {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                return Err(WebDavError::Locked {
                    path: path.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        self.locks
            .get_locked_object_by_path(path)
            .ok_or_else(|| WebDavError::LockInconsistency {
                path: path.to_string(),
            })
    }

    /// Render the response for a fresh grant, giving the lock back if that
    /// fails.
    fn lock_response(
        &self,
        tx: &Transaction,
        status: StatusCode,
        lock: &LockedObject,
        owner: &str,
    ) -> WebDavResult<Response<Bytes>> {
        lock_discovery_response(status, lock, owner).inspect_err(|e| {
            warn!(error = %e, token = lock.token(), "releasing lock after failed response");
            let _ = self.locks.unlock(tx, lock.token(), owner);
        })
    }
}

fn lock_discovery_response(
    status: StatusCode,
    lock: &LockedObject,
    owner: &str,
) -> WebDavResult<Response<Bytes>> {
    let builder = Response::builder()
        .status(status)
        .header(LOCK_TOKEN, to_lock_token_header(lock.token()));

    // 204 carries no body
    let response = if status == StatusCode::NO_CONTENT {
        builder.body(Bytes::new())
    } else {
        builder
            .header(CONTENT_TYPE, CONTENT_TYPE_XML)
            .body(Bytes::from(xml::lock_discovery(lock, owner)?))
    };
    response.map_err(|e| WebDavError::Server(e.to_string()))
}

fn fallback_owner(user_agent: &str) -> String {
    if user_agent.is_empty() {
        "unknown".to_string()
    } else {
        user_agent.to_string()
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
