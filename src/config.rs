//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::time::Duration;

/// Default TTL applied by callers that do not pick one (one hour).
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(60 * 60);

/// Default interval between primary health checks while the circuit is open.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries in the memory cache, 0 = unbounded
    pub capacity: usize,
    /// Default TTL in seconds
    pub default_ttl: u64,
    /// Circuit breaker re-check interval in milliseconds
    pub check_interval_ms: u64,
    /// Log every routed operation at debug level
    pub debug: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum memory cache entries (default: 0, unbounded)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `CACHE_CHECK_INTERVAL_MS` - Circuit breaker check interval (default: 5000)
    /// - `CACHE_DEBUG` - `true` or `1` to enable routing logs (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: parse_var("CACHE_CAPACITY").unwrap_or(defaults.capacity),
            default_ttl: parse_var("CACHE_DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            check_interval_ms: parse_var("CACHE_CHECK_INTERVAL_MS")
                .unwrap_or(defaults.check_interval_ms),
            debug: env::var("CACHE_DEBUG")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true"))
                .unwrap_or(defaults.debug),
        }
    }

    /// Default TTL as a Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    /// Circuit breaker check interval as a Duration.
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 0,
            default_ttl: DEFAULT_CACHE_TIME.as_secs(),
            check_interval_ms: DEFAULT_CHECK_INTERVAL.as_millis() as u64,
            debug: false,
        }
    }
}
