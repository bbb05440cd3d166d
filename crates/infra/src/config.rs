//! Engine configuration.

use std::time::Duration;

/// Environment variable overriding [`EngineConfig::lock_timeout`], in milliseconds.
pub const LOCK_TIMEOUT_ENV: &str = "COSTFLOW_LOCK_TIMEOUT_MS";

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Longest wait for item locks before failing with `ConcurrentModification`.
    pub lock_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(LOCK_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.lock_timeout = Duration::from_millis(ms),
                Err(err) => tracing::warn!(
                    value = %raw,
                    error = %err,
                    "{LOCK_TIMEOUT_ENV} is not a whole number of milliseconds; using default"
                ),
            }
        }
        config
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_uses_default() {
        assert_eq!(EngineConfig::from_lookup(|_| None), EngineConfig::default());
    }

    #[test]
    fn lock_timeout_is_read_in_milliseconds() {
        let config = EngineConfig::from_lookup(|_| Some("250".to_string()));
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
    }

    #[test]
    fn malformed_value_falls_back_to_default() {
        let config = EngineConfig::from_lookup(|_| Some("soon".to_string()));
        assert_eq!(config.lock_timeout, DEFAULT_LOCK_TIMEOUT);
    }
}
