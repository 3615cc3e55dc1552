//! OPTIONS.

use super::{allowed_methods, DavHandler};
use crate::error::{WebDavError, WebDavResult};
use crate::headers::{DAV, MS_AUTHOR_VIA};
use crate::request::DavRequest;
use bytes::Bytes;
use http::header::ALLOW;
use http::{Response, StatusCode};
use lockdav_core::{StoreError, Transaction};
use tracing::instrument;

impl DavHandler {
    #[instrument(level = "debug", skip_all, fields(path = %req.path(), tx = tx.id()))]
    pub(super) fn options(
        &self,
        tx: &Transaction,
        req: &DavRequest,
    ) -> WebDavResult<Response<Bytes>> {
        let path = req.path();
        let temp_owner = Self::temp_owner("OPTIONS", tx);
        let _guard = self
            .locks
            .temporary_guard(tx, path, &temp_owner)
            .ok_or_else(|| WebDavError::TemporaryLockUnavailable {
                path: path.to_string(),
            })?;

        let object = match self.store.get_stored_object(tx, path) {
            Ok(object) => object,
            Err(e @ StoreError::AccessDenied(_)) => return Err(e.into()),
            Err(e) => return Err(WebDavError::Server(e.to_string())),
        };

        Response::builder()
            .status(StatusCode::OK)
            .header(DAV, "1, 2")
            .header(ALLOW, allowed_methods(object.as_ref()))
            .header(MS_AUTHOR_VIA, "DAV")
            .body(Bytes::new())
            .map_err(|e| WebDavError::Server(e.to_string()))
    }
}
