//! Opaque lock token generation and wire formatting.
//!
//! Tokens are random v4 UUIDs. Clients only ever see them wrapped in the
//! `opaquelocktoken:` URI scheme, both in the `Lock-Token` header and in the
//! `locktoken/href` element of a lock discovery response.
//!
//! The header parsers here are deliberately lenient: anything that does not
//! look like a state token is skipped, and a token that names no lock simply
//! fails the table lookup later.

use uuid::Uuid;

/// URI scheme prefix for lock tokens.
pub const OPAQUE_LOCK_TOKEN_SCHEME: &str = "opaquelocktoken:";

/// Generate a fresh lock token.
///
/// Random v4 UUIDs need no coordination between concurrent generators; the
/// lock table still rejects a (practically impossible) duplicate on insert.
pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}

/// Wrap a token as an `opaquelocktoken:` URI.
pub fn to_opaque_uri(token: &str) -> String {
    format!("{OPAQUE_LOCK_TOKEN_SCHEME}{token}")
}

/// Format a token as a `Lock-Token` header value (`<opaquelocktoken:...>`).
pub fn to_lock_token_header(token: &str) -> String {
    format!("<{OPAQUE_LOCK_TOKEN_SCHEME}{token}>")
}

/// Strip an optional `opaquelocktoken:` scheme from a token reference.
///
/// The scheme match is case-insensitive; other URI schemes are returned
/// unchanged so they simply fail the table lookup.
pub fn strip_opaque_scheme(uri: &str) -> &str {
    let uri = uri.trim();
    match uri.get(..OPAQUE_LOCK_TOKEN_SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(OPAQUE_LOCK_TOKEN_SCHEME) => {
            &uri[OPAQUE_LOCK_TOKEN_SCHEME.len()..]
        }
        _ => uri,
    }
}

/// Extract every state token from an `If` header, in order of appearance.
///
/// Only `<...>` references inside parenthesized lists are tokens; resource
/// tags (`<http://...>` before a list) and entity tags (`[...]`) are skipped.
/// `Not` conditions are returned like any other token. The
/// `opaquelocktoken:` scheme is stripped from each result.
///
/// ```
/// use lockdav_core::token::parse_if_header;
///
/// let header = "<http://host/a> (<opaquelocktoken:t1> [\"etag\"]) (Not <urn:x>)";
/// assert_eq!(parse_if_header(header), ["t1", "urn:x"]);
/// ```
pub fn parse_if_header(header: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut in_list = false;
    let mut chars = header.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '(' => in_list = true,
            ')' => in_list = false,
            '[' => {
                // Entity tags may contain '<' inside their quotes
                for (_, c) in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                }
            }
            '<' => {
                let start = idx + 1;
                let mut end = None;
                for (i, c) in chars.by_ref() {
                    if c == '>' {
                        end = Some(i);
                        break;
                    }
                }
                let Some(end) = end else {
                    break;
                };
                if in_list {
                    let token = strip_opaque_scheme(&header[start..end]);
                    if !token.is_empty() {
                        tokens.push(token.to_string());
                    }
                }
            }
            _ => {}
        }
    }
    tokens
}

/// Parse a `Lock-Token` request header (`<opaquelocktoken:...>`).
///
/// Returns `None` unless the value is a single bracketed reference.
pub fn parse_lock_token_header(header: &str) -> Option<String> {
    let inner = header.trim().strip_prefix('<')?.strip_suffix('>')?;
    if inner.contains(['<', '>']) {
        return None;
    }
    let token = strip_opaque_scheme(inner);
    (!token.is_empty()).then(|| token.to_string())
}
