//! WebDAV request header parsing.

use crate::error::{WebDavError, WebDavResult};
use http::HeaderMap;
use lockdav_core::token::{parse_if_header, parse_lock_token_header};
use lockdav_core::Depth;

/// `If` conditional header.
pub const IF: &str = "if";
/// `Depth` header.
pub const DEPTH: &str = "depth";
/// `Timeout` header.
pub const TIMEOUT: &str = "timeout";
/// `Lock-Token` header.
pub const LOCK_TOKEN: &str = "lock-token";
/// `DAV` compliance header.
pub const DAV: &str = "dav";
/// Header Microsoft clients look for before speaking WebDAV.
pub const MS_AUTHOR_VIA: &str = "ms-author-via";

/// Parse the `Depth` header of a LOCK request.
///
/// Absent means infinity. Only `0` and `infinity` are valid lock depths.
pub fn parse_depth(value: Option<&str>) -> WebDavResult<Depth> {
    match value.map(str::trim) {
        None => Ok(Depth::Infinity),
        Some(v) if v.eq_ignore_ascii_case("infinity") => Ok(Depth::Infinity),
        Some("0") => Ok(Depth::Zero),
        Some(other) => Err(WebDavError::BadRequest(format!(
            "invalid Depth for LOCK: {other}"
        ))),
    }
}

/// All state tokens from every `If` header, in order.
pub fn if_tokens(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(IF)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(parse_if_header)
        .collect()
}

/// The token named by the `Lock-Token` header.
pub fn lock_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LOCK_TOKEN)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_lock_token_header)
}
