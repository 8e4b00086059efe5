//! # Types
//!
//! Core types for the reconciler.

use crate::backend::{BackendClient, BackendError};
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::store::{SecretStore, StoreError};
use crate::crd::SecretSource;
use crate::shaping::ShapeError;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("cannot shape secret: {0}")]
    Shape(#[from] ShapeError),

    #[error("cannot store secret: {0}")]
    Store(#[from] StoreError),

    #[error("invalid SecretSource: {0}")]
    InvalidSource(String),
}

impl ReconcilerError {
    /// Short label for metrics and structured logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcilerError::Backend(e) => e.kind(),
            ReconcilerError::Shape(_) => "shape",
            ReconcilerError::Store(StoreError::Conflict { .. }) => "conflict",
            ReconcilerError::Store(_) => "store",
            ReconcilerError::InvalidSource(_) => "invalid_source",
        }
    }
}

/// Trigger source for reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// SecretSource add or update delivered by the watch
    Event,
    /// Periodic refresh sweep
    Scheduled,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::Event => "event",
            TriggerSource::Scheduled => "scheduled",
        }
    }
}

/// What a reconciliation did to the materialized secret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
    Unchanged,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Created => "created",
            ReconcileOutcome::Updated => "updated",
            ReconcileOutcome::Unchanged => "unchanged",
        }
    }

    #[must_use]
    pub fn wrote(&self) -> bool {
        !matches!(self, ReconcileOutcome::Unchanged)
    }
}

/// (namespace, name) shared by a SecretSource and the Secret it materializes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceIdentity {
    pub namespace: String,
    pub name: String,
}

impl SourceIdentity {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// # Errors
    /// Returns [`ReconcilerError::InvalidSource`] when the source has no namespace or name.
    pub fn of(source: &SecretSource) -> Result<Self, ReconcilerError> {
        let namespace = source
            .metadata
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .ok_or_else(|| ReconcilerError::InvalidSource("missing namespace".to_string()))?;
        let name = source
            .metadata
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ReconcilerError::InvalidSource("missing name".to_string()))?;
        Ok(Self::new(namespace, name))
    }
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Backoff state for a specific resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_seconds, max_seconds),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Shared state for the event handler and the refresh scheduler
#[derive(Clone)]
pub struct Reconciler {
    pub backend: Arc<dyn BackendClient>,
    pub store: Arc<dyn SecretStore>,
    // One async lock per identity; the event path and the scheduler both take it
    // so a read-compare-write for one secret never interleaves with another
    operation_locks: Arc<Mutex<HashMap<SourceIdentity, Arc<AsyncMutex<()>>>>>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(backend: Arc<dyn BackendClient>, store: Arc<dyn SecretStore>) -> Self {
        Self {
            backend,
            store,
            operation_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get or create the operation lock for an identity
    pub fn get_operation_lock(&self, identity: &SourceIdentity) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .operation_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            locks
                .entry(identity.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }
}
