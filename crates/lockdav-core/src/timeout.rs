//! `Timeout` header interpretation.

use crate::config::LockConfig;
use std::time::Duration;

/// Resolve a requested lock duration from a raw `Timeout` header value.
///
/// Only the first of several comma-separated candidates is considered.
/// `Second-N` asks for N seconds, `Infinite` for the configured maximum, and a
/// bare integer is read as seconds. Absent or unparsable values, and values of
/// zero or less, yield the configured default. Anything above the maximum is
/// clamped to it.
///
/// ```
/// use lockdav_core::{timeout::parse_timeout, LockConfig};
/// use std::time::Duration;
///
/// let config = LockConfig::default().max_timeout(Duration::from_secs(86_400));
/// assert_eq!(
///     parse_timeout(Some("Second-10000000, Second-60"), &config),
///     Duration::from_secs(86_400)
/// );
/// ```
pub fn parse_timeout(header: Option<&str>, config: &LockConfig) -> Duration {
    let default = config.effective_default();
    let Some(raw) = header else {
        return default;
    };

    let first = raw.split(',').next().unwrap_or_default().trim();
    if first.eq_ignore_ascii_case("infinite") || first.eq_ignore_ascii_case("infinity") {
        return config.max_timeout;
    }

    let seconds = match first.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("Second-") => parse_seconds(&first[7..]),
        _ => parse_seconds(first),
    };

    match seconds {
        Some(secs) if secs > 0 => u64::try_from(secs)
            .map_or(config.max_timeout, Duration::from_secs)
            .min(config.max_timeout),
        _ => default,
    }
}

/// Parses a signed decimal, saturating values too large for `i64`.
fn parse_seconds(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    match raw.parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) => Some(i64::MAX),
        Err(_) => None,
    }
}
