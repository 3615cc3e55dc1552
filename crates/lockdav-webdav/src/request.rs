//! Per-request context.

use crate::error::{WebDavError, WebDavResult};
use crate::headers;
use bytes::Bytes;
use http::header::USER_AGENT;
use http::{HeaderMap, Method, Request};
use lockdav_core::path::{normalize_path, parent_path};
use percent_encoding::percent_decode_str;

/// A decoded WebDAV request.
///
/// Built once per request by the dispatcher; handlers only read from it.
#[derive(Debug, Clone)]
pub struct DavRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
}

impl DavRequest {
    /// Decode the target path of an HTTP request.
    ///
    /// The URI path is percent-decoded and normalized. Paths that do not
    /// decode to UTF-8 or that contain `..` segments are rejected.
    pub fn from_http(request: Request<Bytes>) -> WebDavResult<Self> {
        let (parts, body) = request.into_parts();
        let raw = parts.uri.path();
        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| WebDavError::BadRequest(format!("path is not UTF-8: {raw}")))?;
        let path = normalize_path(&decoded)?;

        Ok(Self {
            method: parts.method,
            path,
            headers: parts.headers,
            body,
        })
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The normalized target path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The target's parent, `None` for the root.
    pub fn parent(&self) -> Option<&str> {
        parent_path(&self.path)
    }

    /// All request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The `User-Agent` header, empty if absent.
    pub fn user_agent(&self) -> &str {
        self.headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// Lock tokens submitted through the `If` header.
    pub fn if_tokens(&self) -> Vec<String> {
        headers::if_tokens(&self.headers)
    }

    /// Returns true if an `If` header is present at all.
    pub fn has_if_header(&self) -> bool {
        self.headers.contains_key(headers::IF)
    }
}
