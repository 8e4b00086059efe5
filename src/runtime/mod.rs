//! # Runtime
//!
//! Process wiring: startup, the kube-runtime watch loop and its error policy.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

use crate::controller::reconciler::{BackoffState, Reconciler, SourceIdentity};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Context handed to every reconcile and error-policy call by the controller
#[derive(Debug)]
pub struct Context {
    pub reconciler: Arc<Reconciler>,
    // Backoff state per SecretSource, advanced by the error policy and reset on success
    pub backoff_states: Mutex<HashMap<SourceIdentity, BackoffState>>,
    pub backoff_min_secs: u64,
    pub backoff_max_secs: u64,
}

impl Context {
    #[must_use]
    pub fn new(reconciler: Arc<Reconciler>, backoff_min_secs: u64, backoff_max_secs: u64) -> Self {
        Self {
            reconciler,
            backoff_states: Mutex::new(HashMap::new()),
            backoff_min_secs,
            backoff_max_secs,
        }
    }
}
