//! # Secret Sync Controller
//!
//! Watches `SecretSource` resources and keeps a Kubernetes `Secret` per source in
//! line with a Vault-style secret backend.
//!
//! ## Configuration
//!
//! Settings come from environment variables (see `ControllerConfig`):
//! - `VAULT_ADDR` / `BACKEND_BASE_URL`, `VAULT_TOKEN`
//! - `REFRESH_INTERVAL_SECS`, `REFRESH_INITIAL_DELAY_SECS`, `MAX_CONCURRENT_REFRESHES`
//! - `BACKOFF_MIN_SECS`, `BACKOFF_MAX_SECS`, `MAX_CONCURRENT_RECONCILIATIONS`
//! - `ANNOTATION_PREFIX`, `METRICS_PORT`, `LOG_LEVEL`, `LOG_FORMAT`

use anyhow::{Context as _, Result};
use secret_sync_controller::config::ControllerConfig;
use secret_sync_controller::runtime::initialization::initialize;
use secret_sync_controller::runtime::watch_loop::run_watch_loop;
use secret_sync_controller::runtime::Context;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ControllerConfig::from_env();
    let init = initialize(&config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = init.scheduler;
    let scheduler_handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    let ctx = Arc::new(Context::new(
        init.reconciler,
        config.backoff_min_secs,
        config.backoff_max_secs,
    ));
    run_watch_loop(
        init.sources,
        ctx,
        init.server_state,
        config.max_concurrent_reconciliations,
    )
    .await;

    info!("Waiting for the refresh scheduler to finish...");
    if shutdown_tx.send(true).is_err() {
        debug!("Refresh scheduler already stopped");
    }
    scheduler_handle
        .await
        .context("Refresh scheduler task panicked")?;

    info!("Shutdown complete");
    Ok(())
}
