//! # Watch Loop
//!
//! Watches SecretSource resources in all namespaces and runs the event handler on
//! every add or update.

use crate::controller::reconciler::{ReconcilerError, SourceIdentity};
use crate::controller::server::ServerState;
use crate::crd::SecretSource;
use crate::runtime::error_policy::{handle_reconciliation_error, reset_backoff};
use crate::runtime::Context;
use futures::StreamExt;
use kube::api::Api;
use kube::ResourceExt;
use kube_runtime::controller::{self, Action};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Run the controller until SIGINT or SIGTERM
///
/// Readiness is reported once the watch starts and withdrawn when it stops.
pub async fn run_watch_loop(
    sources: Api<SecretSource>,
    ctx: Arc<Context>,
    server_state: Arc<ServerState>,
    max_concurrent_reconciliations: u16,
) {
    info!(
        concurrency = max_concurrent_reconciliations,
        "Starting controller watch loop..."
    );
    server_state.set_ready(true);

    Controller::new(sources, watcher::Config::default().any_semantic())
        .with_config(controller::Config::default().concurrency(max_concurrent_reconciliations))
        .shutdown_on_signal()
        .run(reconcile_source, handle_reconciliation_error, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, action)) => {
                    debug!(resource = %object, ?action, "watch.event.reconciled");
                }
                Err(controller::Error::ReconcilerFailed(_, object)) => {
                    // Already logged and requeued by the error policy
                    debug!(resource = %object, "watch.event.reconciliation_failed");
                }
                Err(e) => {
                    warn!(error = %e, "Controller stream error");
                }
            }
        })
        .await;

    server_state.set_ready(false);
    info!("Controller stopped gracefully");
}

/// Event handler entry point for the controller
async fn reconcile_source(
    obj: Arc<SecretSource>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcilerError> {
    let span = tracing::info_span!(
        "controller.watch.reconcile",
        resource.name = %obj.name_any(),
        resource.namespace = %obj.namespace().unwrap_or_default(),
        resource.version = %obj.resource_version().unwrap_or_default(),
    );

    async move {
        let identity = SourceIdentity::of(&obj)?;
        let outcome = ctx.reconciler.add_handler(&obj).await?;
        reset_backoff(&ctx, &identity);
        debug!(outcome = outcome.as_str(), "watch.event.handled");

        // Backend changes are picked up by the refresh scheduler, not by requeueing
        Ok(Action::await_change())
    }
    .instrument(span)
    .await
}
