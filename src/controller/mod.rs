//! # Controller
//!
//! - `backoff`: Fibonacci backoff for failed reconciliations
//! - `fingerprint`: change detection digest over shaped secret data
//! - `reconciler`: fetch, shape, compare and write for one SecretSource
//! - `scheduler`: periodic refresh sweep over all SecretSources
//! - `server`: HTTP server for metrics and health checks
//! - `store`: Kubernetes Secret storage

pub mod backoff;
pub mod fingerprint;
pub mod reconciler;
pub mod scheduler;
pub mod server;
pub mod store;
