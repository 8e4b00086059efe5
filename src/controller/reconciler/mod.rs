//! # Reconciler
//!
//! Keeps one Kubernetes `Secret` per `SecretSource` in line with the backend.
//!
//! ## Reconciliation Flow
//!
//! 1. Resolve the source's type into a shaping strategy
//! 2. Fetch the payload from the backend
//! 3. Shape it into Secret data and classification
//! 4. Fingerprint the shaped data
//! 5. Compare with the compare annotation and type of the stored Secret
//! 6. Write data, fingerprint and timestamp in one call, or do nothing

mod reconcile;
pub mod types;

pub use types::{
    BackoffState, ReconcileOutcome, Reconciler, ReconcilerError, SourceIdentity, TriggerSource,
};
