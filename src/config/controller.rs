//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_ANNOTATION_PREFIX, DEFAULT_BACKEND_BASE_URL, DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS,
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
    DEFAULT_MAX_CONCURRENT_REFRESHES, DEFAULT_METRICS_PORT, DEFAULT_REFRESH_INITIAL_DELAY_SECS,
    DEFAULT_REFRESH_INTERVAL_SECS,
};
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment,
/// except `VAULT_TOKEN` which should come from a Secret.
#[derive(Clone)]
pub struct ControllerConfig {
    /// Base URL of the Vault HTTP API, e.g. `https://vault:8200/v1`
    pub backend_base_url: String,
    /// Token sent as `X-Vault-Token`; requests are anonymous when unset
    pub backend_token: Option<String>,
    /// Timeout for a single backend request (seconds)
    pub backend_request_timeout_secs: u64,
    /// Interval between scheduled refresh sweeps (seconds)
    pub refresh_interval_secs: u64,
    /// Delay before the first scheduled sweep (seconds)
    pub refresh_initial_delay_secs: u64,
    /// Sources refreshed in parallel during one sweep
    pub max_concurrent_refreshes: usize,
    /// Event-driven reconciliations running in parallel
    pub max_concurrent_reconciliations: u16,
    /// Fibonacci backoff floor after a failed reconciliation (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci backoff ceiling after repeated failures (seconds)
    pub backoff_max_secs: u64,
    /// Prefix of the compare / last-update annotations
    pub annotation_prefix: String,
    /// Port of the metrics and probe server
    pub metrics_port: u16,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("backend_base_url", &self.backend_base_url)
            .field("backend_token", &self.backend_token.as_ref().map(|_| "***"))
            .field(
                "backend_request_timeout_secs",
                &self.backend_request_timeout_secs,
            )
            .field("refresh_interval_secs", &self.refresh_interval_secs)
            .field("refresh_initial_delay_secs", &self.refresh_initial_delay_secs)
            .field("max_concurrent_refreshes", &self.max_concurrent_refreshes)
            .field(
                "max_concurrent_reconciliations",
                &self.max_concurrent_reconciliations,
            )
            .field("backoff_min_secs", &self.backoff_min_secs)
            .field("backoff_max_secs", &self.backoff_max_secs)
            .field("annotation_prefix", &self.annotation_prefix)
            .field("metrics_port", &self.metrics_port)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            backend_base_url: DEFAULT_BACKEND_BASE_URL.to_string(),
            backend_token: None,
            backend_request_timeout_secs: DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            refresh_initial_delay_secs: DEFAULT_REFRESH_INITIAL_DELAY_SECS,
            max_concurrent_refreshes: DEFAULT_MAX_CONCURRENT_REFRESHES,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            annotation_prefix: DEFAULT_ANNOTATION_PREFIX.to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `VAULT_ADDR` is accepted as a fallback for `BACKEND_BASE_URL`; a bare
    /// address without an API version gets `/v1` appended.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let backend_base_url = lookup("BACKEND_BASE_URL")
            .or_else(|| lookup("VAULT_ADDR").map(|addr| with_api_version(&addr)))
            .unwrap_or(defaults.backend_base_url);

        Self {
            backend_base_url,
            backend_token: lookup("VAULT_TOKEN").filter(|t| !t.trim().is_empty()),
            backend_request_timeout_secs: parsed_or(
                &lookup,
                "BACKEND_REQUEST_TIMEOUT_SECS",
                defaults.backend_request_timeout_secs,
            ),
            refresh_interval_secs: parsed_or(
                &lookup,
                "REFRESH_INTERVAL_SECS",
                defaults.refresh_interval_secs,
            ),
            refresh_initial_delay_secs: parsed_or(
                &lookup,
                "REFRESH_INITIAL_DELAY_SECS",
                defaults.refresh_initial_delay_secs,
            ),
            max_concurrent_refreshes: parsed_or(
                &lookup,
                "MAX_CONCURRENT_REFRESHES",
                defaults.max_concurrent_refreshes,
            )
            .max(1),
            max_concurrent_reconciliations: parsed_or(
                &lookup,
                "MAX_CONCURRENT_RECONCILIATIONS",
                defaults.max_concurrent_reconciliations,
            ),
            backoff_min_secs: parsed_or(&lookup, "BACKOFF_MIN_SECS", defaults.backoff_min_secs),
            backoff_max_secs: parsed_or(&lookup, "BACKOFF_MAX_SECS", defaults.backoff_max_secs),
            annotation_prefix: lookup("ANNOTATION_PREFIX").unwrap_or(defaults.annotation_prefix),
            metrics_port: parsed_or(&lookup, "METRICS_PORT", defaults.metrics_port),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT").unwrap_or(defaults.log_format),
        }
    }

    /// Get backend request timeout duration
    #[must_use]
    pub fn backend_request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_request_timeout_secs)
    }

    /// Get refresh interval duration
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Get initial refresh delay duration
    #[must_use]
    pub fn refresh_initial_delay(&self) -> Duration {
        Duration::from_secs(self.refresh_initial_delay_secs)
    }
}

/// Read and parse a value, falling back to the default when absent or unparsable
fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn with_api_version(addr: &str) -> String {
    let trimmed = addr.trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = ControllerConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.backend_base_url, DEFAULT_BACKEND_BASE_URL);
        assert_eq!(config.refresh_interval_secs, DEFAULT_REFRESH_INTERVAL_SECS);
        assert_eq!(config.annotation_prefix, DEFAULT_ANNOTATION_PREFIX);
        assert!(config.backend_token.is_none());
    }

    #[test]
    fn test_vault_addr_gets_api_version() {
        let config =
            ControllerConfig::from_lookup(lookup_from(&[("VAULT_ADDR", "https://vault:8200/")]));
        assert_eq!(config.backend_base_url, "https://vault:8200/v1");
    }

    #[test]
    fn test_explicit_base_url_wins_over_vault_addr() {
        let config = ControllerConfig::from_lookup(lookup_from(&[
            ("VAULT_ADDR", "https://ignored:8200"),
            ("BACKEND_BASE_URL", "http://localhost:8206/v1/"),
        ]));
        assert_eq!(config.backend_base_url, "http://localhost:8206/v1/");
    }

    #[test]
    fn test_unparsable_numbers_fall_back() {
        let config = ControllerConfig::from_lookup(lookup_from(&[
            ("REFRESH_INTERVAL_SECS", "soon"),
            ("MAX_CONCURRENT_REFRESHES", "0"),
            ("REFRESH_INITIAL_DELAY_SECS", " 5 "),
        ]));
        assert_eq!(config.refresh_interval_secs, DEFAULT_REFRESH_INTERVAL_SECS);
        assert_eq!(config.max_concurrent_refreshes, 1);
        assert_eq!(config.refresh_initial_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_blank_token_is_ignored_and_token_is_redacted() {
        let blank = ControllerConfig::from_lookup(lookup_from(&[("VAULT_TOKEN", "  ")]));
        assert!(blank.backend_token.is_none());

        let set = ControllerConfig::from_lookup(lookup_from(&[("VAULT_TOKEN", "s.abcdef")]));
        assert_eq!(set.backend_token.as_deref(), Some("s.abcdef"));
        assert!(!format!("{set:?}").contains("s.abcdef"));
    }
}
