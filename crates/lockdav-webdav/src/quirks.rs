//! Client-specific LOCK behaviour.
//!
//! Both workarounds are keyed on the `User-Agent` header and kept out of the
//! general locking flow.

/// Workarounds that apply to one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientQuirks {
    /// macOS Finder sends a bodyless LOCK and then locks the same path again.
    /// It gets a shared lock so the second request is not refused.
    pub mac_finder: bool,
    /// Transmit expects `204 No Content` instead of `201 Created` after a
    /// null-resource lock.
    pub transmit: bool,
}

impl ClientQuirks {
    /// Detect the workarounds for a LOCK request.
    pub fn detect(user_agent: &str, body_is_empty: bool) -> Self {
        Self {
            mac_finder: body_is_empty && user_agent.contains("Darwin"),
            transmit: user_agent.contains("Transmit"),
        }
    }

    /// Owner identity for a Finder lock, which carries no owner element.
    pub fn finder_owner(user_agent: &str, millis: u128) -> String {
        format!("{user_agent}{millis}")
    }
}
