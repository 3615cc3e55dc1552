//! Resource path helpers.
//!
//! Lock records are keyed by normalized absolute paths: a leading `/`, no
//! trailing `/` (except for the root itself), no empty, `.` or `..` segments.
//! With that form a plain string prefix test decides ancestry, which is what
//! the lock table's ordered index relies on.

use crate::error::{LockError, LockResult};

/// The root collection.
pub const ROOT: &str = "/";

/// Normalize a decoded request path.
///
/// Duplicate slashes and `.` segments are dropped and a trailing slash is
/// removed. `..` segments are rejected rather than resolved so a request can
/// never address something outside the tree it names.
///
/// # Example
///
/// ```
/// use lockdav_core::path::normalize_path;
///
/// assert_eq!(normalize_path("//docs/./a.txt/").unwrap(), "/docs/a.txt");
/// assert_eq!(normalize_path("").unwrap(), "/");
/// assert!(normalize_path("/docs/../etc").is_err());
/// ```
pub fn normalize_path(raw: &str) -> LockResult<String> {
    if raw.contains('\0') {
        return Err(LockError::InvalidPath(raw.to_string()));
    }

    let mut normalized = String::with_capacity(raw.len() + 1);
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(LockError::InvalidPath(raw.to_string())),
            name => {
                normalized.push('/');
                normalized.push_str(name);
            }
        }
    }

    if normalized.is_empty() {
        normalized.push('/');
    }
    Ok(normalized)
}

/// Returns the parent of a normalized path, or `None` for the root.
pub fn parent_path(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Iterates the proper ancestors of a normalized path, nearest first.
///
/// ```
/// use lockdav_core::path::ancestors;
///
/// let chain: Vec<_> = ancestors("/a/b/c").collect();
/// assert_eq!(chain, ["/a/b", "/a", "/"]);
/// ```
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(parent_path(path), |p| parent_path(p))
}

/// Returns true if `path` lies strictly below `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor == ROOT {
        return path != ROOT && path.starts_with('/');
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

/// The string every descendant key of `path` starts with.
pub(crate) fn descendant_prefix(path: &str) -> String {
    if path == ROOT {
        ROOT.to_string()
    } else {
        format!("{path}/")
    }
}
