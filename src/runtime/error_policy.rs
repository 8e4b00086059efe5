//! # Error Policy
//!
//! Requeue decisions for failed event-driven reconciliations.

use crate::controller::reconciler::{BackoffState, ReconcilerError, SourceIdentity};
use crate::crd::SecretSource;
use crate::observability::metrics;
use crate::runtime::Context;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::{Arc, PoisonError};
use tracing::{info, warn};

/// Requeue a failed SecretSource with per-resource Fibonacci backoff
///
/// Each resource advances its own sequence, so one broken backend path cannot delay
/// retries of healthy sources.
pub fn handle_reconciliation_error(
    obj: Arc<SecretSource>,
    error: &ReconcilerError,
    ctx: Arc<Context>,
) -> Action {
    let identity = SourceIdentity::new(obj.namespace().unwrap_or_default(), obj.name_any());

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = identity.name.as_str(),
        resource.namespace = identity.namespace.as_str(),
        error.kind = error.kind(),
    );
    let _error_guard = error_span.enter();

    warn!(error = %error, "Reconciliation failed");

    let (backoff, error_count) = {
        let mut states = ctx
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let state = states
            .entry(identity)
            .or_insert_with(|| BackoffState::new(ctx.backoff_min_secs, ctx.backoff_max_secs));
        state.increment_error();
        (state.backoff.next_backoff(), state.error_count)
    };

    info!(
        backoff_secs = backoff.as_secs(),
        error_count, "Retrying with Fibonacci backoff"
    );

    metrics::increment_requeues_total("error-backoff");
    Action::requeue(backoff)
}

/// Forget the backoff of a resource after it reconciled successfully
pub fn reset_backoff(ctx: &Context, identity: &SourceIdentity) {
    let mut states = ctx
        .backoff_states
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(state) = states.get_mut(identity) {
        state.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendClient, BackendError, BackendSecretPayload};
    use crate::controller::reconciler::Reconciler;
    use crate::controller::store::{MaterializedSecret, SecretStore, StoreError};
    use crate::crd::SecretSourceSpec;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Unused;

    #[async_trait]
    impl BackendClient for Unused {
        async fn fetch(&self, path: &str) -> Result<BackendSecretPayload, BackendError> {
            Err(BackendError::NotFound {
                path: path.to_string(),
            })
        }
    }

    #[async_trait]
    impl SecretStore for Unused {
        async fn get(
            &self,
            _identity: &SourceIdentity,
        ) -> Result<Option<MaterializedSecret>, StoreError> {
            Ok(None)
        }

        async fn upsert(
            &self,
            _existing: Option<&MaterializedSecret>,
            _desired: &MaterializedSecret,
        ) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn context() -> Arc<Context> {
        let reconciler = Reconciler::new(Arc::new(Unused), Arc::new(Unused));
        Arc::new(Context::new(Arc::new(reconciler), 5, 300))
    }

    fn source(name: &str) -> Arc<SecretSource> {
        let mut source = SecretSource::new(
            name,
            SecretSourceSpec {
                path: "secret/data/app".to_string(),
                secret_type: "KEYVALUE".to_string(),
                key_value: None,
                docker_cfg: None,
            },
        );
        source.metadata.namespace = Some("default".to_string());
        Arc::new(source)
    }

    fn error() -> ReconcilerError {
        ReconcilerError::Backend(BackendError::NotFound {
            path: "secret/data/app".to_string(),
        })
    }

    #[test]
    fn test_backoff_grows_per_resource_and_resets() {
        let ctx = context();
        let failing = source("failing");

        let delays: Vec<Action> = (0..3)
            .map(|_| handle_reconciliation_error(Arc::clone(&failing), &error(), Arc::clone(&ctx)))
            .collect();
        assert_eq!(delays[0], Action::requeue(Duration::from_secs(5)));
        assert_eq!(delays[1], Action::requeue(Duration::from_secs(5)));
        assert_eq!(delays[2], Action::requeue(Duration::from_secs(10)));

        // Another resource starts its own sequence
        let other = handle_reconciliation_error(source("other"), &error(), Arc::clone(&ctx));
        assert_eq!(other, Action::requeue(Duration::from_secs(5)));

        reset_backoff(&ctx, &SourceIdentity::new("default", "failing"));
        let after_reset = handle_reconciliation_error(failing, &error(), ctx);
        assert_eq!(after_reset, Action::requeue(Duration::from_secs(5)));
    }
}
