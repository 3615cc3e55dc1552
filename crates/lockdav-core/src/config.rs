//! Lock duration configuration.
//!
//! Durations follow the classic servlet defaults: one hour when the client
//! does not ask for anything, one week at most, and ten seconds for the
//! temporary locks that serialize a single request.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lock duration used when the client sends no usable `Timeout` header.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(3600);

/// Upper bound for any requested lock duration.
pub const MAX_LOCK_TIMEOUT: Duration = Duration::from_secs(604_800);

/// Lifetime of request-scoped temporary locks.
pub const TEMP_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for lock durations.
///
/// Durations are (de)serialized in humantime notation (`"1h"`, `"7days"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Duration granted when the `Timeout` header is absent or unusable.
    ///
    /// Default: 1 hour.
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,

    /// Longest duration ever granted. `Infinite` requests map to this value.
    ///
    /// Default: 7 days.
    #[serde(with = "humantime_serde")]
    pub max_timeout: Duration,

    /// Lifetime of temporary locks, bounding how long a crashed request can
    /// keep a path serialized.
    ///
    /// Default: 10 seconds.
    #[serde(with = "humantime_serde")]
    pub temp_timeout: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_LOCK_TIMEOUT,
            max_timeout: MAX_LOCK_TIMEOUT,
            temp_timeout: TEMP_LOCK_TIMEOUT,
        }
    }
}

impl LockConfig {
    /// Sets the default lock duration.
    #[must_use]
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the maximum lock duration.
    #[must_use]
    pub fn max_timeout(mut self, timeout: Duration) -> Self {
        self.max_timeout = timeout;
        self
    }

    /// Sets the temporary lock lifetime.
    #[must_use]
    pub fn temp_timeout(mut self, timeout: Duration) -> Self {
        self.temp_timeout = timeout;
        self
    }

    /// The default duration, never exceeding the maximum.
    pub fn effective_default(&self) -> Duration {
        self.default_timeout.min(self.max_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LockConfig::default();
        assert_eq!(config.default_timeout, Duration::from_secs(3600));
        assert_eq!(config.max_timeout, Duration::from_secs(604_800));
        assert_eq!(config.temp_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder_pattern() {
        let config = LockConfig::default()
            .default_timeout(Duration::from_secs(60))
            .max_timeout(Duration::from_secs(86_400))
            .temp_timeout(Duration::from_secs(2));
        assert_eq!(config.default_timeout, Duration::from_secs(60));
        assert_eq!(config.max_timeout, Duration::from_secs(86_400));
        assert_eq!(config.temp_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_effective_default_is_clamped() {
        let config = LockConfig::default()
            .default_timeout(Duration::from_secs(7200))
            .max_timeout(Duration::from_secs(600));
        assert_eq!(config.effective_default(), Duration::from_secs(600));
    }

    #[test]
    fn test_humantime_deserialization() {
        let config: LockConfig = toml::from_str(
            r#"
            default_timeout = "10m"
            max_timeout = "1day"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_timeout, Duration::from_secs(600));
        assert_eq!(config.max_timeout, Duration::from_secs(86_400));
        // Missing keys fall back to defaults
        assert_eq!(config.temp_timeout, TEMP_LOCK_TIMEOUT);
    }
}
