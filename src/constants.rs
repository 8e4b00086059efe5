//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable (see [`crate::config::ControllerConfig`]).

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default base URL of the Vault HTTP API (includes the API version segment)
pub const DEFAULT_BACKEND_BASE_URL: &str = "http://127.0.0.1:8200/v1";

/// Default timeout for a single backend request (seconds)
pub const DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default interval between two scheduled refresh sweeps (seconds)
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

/// Default delay before the first scheduled sweep (seconds)
/// Gives the watch-driven reconciliation time to settle after startup
pub const DEFAULT_REFRESH_INITIAL_DELAY_SECS: u64 = 30;

/// Default number of sources refreshed in parallel during a sweep
pub const DEFAULT_MAX_CONCURRENT_REFRESHES: usize = 10;

/// Default number of event-driven reconciliations running in parallel
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Default Fibonacci backoff floor for failed reconciliations (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default Fibonacci backoff ceiling for failed reconciliations (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default prefix for the annotations written on materialized secrets
pub const DEFAULT_ANNOTATION_PREFIX: &str = "secret-sync.octopilot.io";

/// Annotation suffix holding the fingerprint of the stored data
pub const COMPARE_ANNOTATION: &str = "/compare";

/// Annotation suffix holding the RFC 3339 timestamp of the last write
pub const LAST_UPDATE_ANNOTATION: &str = "/last-update";

/// Header carrying the Vault token on backend requests
pub const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

/// Field manager / controller name used in logs and owner references
pub const CONTROLLER_NAME: &str = "secret-sync-controller";
