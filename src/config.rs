//! # Controller Configuration
//!
//! Controller-level configuration loaded from environment variables
//! (populated from a ConfigMap using `envFrom` in the deployment).
//!
//! All configuration has sensible defaults and can be overridden via environment variables.

use crate::constants::{
    DEFAULT_ERROR_BACKOFF_MAX_SECS, DEFAULT_ERROR_BACKOFF_MIN_SECS, DEFAULT_METRICS_PORT,
    DEFAULT_RECONCILE_TIMEOUT_SECS, DEFAULT_SERVER_POLL_INTERVAL_MS,
    DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
};
use std::time::Duration;

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// HTTP server port for metrics and health probes
    pub metrics_port: u16,
    /// Server startup timeout (seconds)
    /// How long to wait for server to be ready before giving up
    pub startup_timeout_secs: u64,
    /// Server readiness poll interval (milliseconds)
    pub poll_interval_ms: u64,
    /// Deadline for a single reconcile invocation (seconds)
    pub reconcile_timeout_secs: u64,
    /// First retry delay after a reconcile error (seconds)
    pub backoff_min_secs: u64,
    /// Cap on the retry delay after repeated reconcile errors (seconds)
    pub backoff_max_secs: u64,
    /// Restrict all watches to this namespace. `None` watches the whole cluster.
    pub watch_namespace: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
            reconcile_timeout_secs: DEFAULT_RECONCILE_TIMEOUT_SECS,
            backoff_min_secs: DEFAULT_ERROR_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_ERROR_BACKOFF_MAX_SECS,
            watch_namespace: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Values that are missing or fail to parse fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let backoff_min_secs =
            parse_or_default(&lookup, "ERROR_BACKOFF_MIN_SECS", defaults.backoff_min_secs).max(1);
        let backoff_max_secs =
            parse_or_default(&lookup, "ERROR_BACKOFF_MAX_SECS", defaults.backoff_max_secs)
                .max(backoff_min_secs);

        Self {
            metrics_port: parse_or_default(&lookup, "METRICS_PORT", defaults.metrics_port),
            startup_timeout_secs: parse_or_default(
                &lookup,
                "SERVER_STARTUP_TIMEOUT_SECS",
                defaults.startup_timeout_secs,
            ),
            poll_interval_ms: parse_or_default(
                &lookup,
                "SERVER_POLL_INTERVAL_MS",
                defaults.poll_interval_ms,
            ),
            reconcile_timeout_secs: parse_or_default(
                &lookup,
                "RECONCILE_TIMEOUT_SECS",
                defaults.reconcile_timeout_secs,
            )
            .max(1),
            backoff_min_secs,
            backoff_max_secs,
            watch_namespace: lookup("WATCH_NAMESPACE")
                .map(|ns| ns.trim().to_string())
                .filter(|ns| !ns.is_empty()),
        }
    }

    #[must_use]
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }

    #[must_use]
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Read a key through `lookup` and parse it, or return the default value
fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
