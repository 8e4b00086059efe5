//! # Initialization
//!
//! Controller initialization: rustls setup, tracing, metrics, server startup,
//! Kubernetes client and the reconciler with its collaborators.

use crate::backend::VaultHttpClient;
use crate::config::ControllerConfig;
use crate::controller::reconciler::Reconciler;
use crate::controller::scheduler::{KubeSourceCatalog, RefreshScheduler};
use crate::controller::server::{start_server, ServerState};
use crate::controller::store::KubeSecretStore;
use crate::crd::SecretSource;
use crate::observability;
use anyhow::{Context, Result};
use kube::{api::Api, Client};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Everything the watch loop and the scheduler need
pub struct InitializationResult {
    pub sources: Api<SecretSource>,
    pub reconciler: Arc<Reconciler>,
    pub scheduler: RefreshScheduler,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("scheduler", &self.scheduler)
            .field("server_state", &self.server_state)
            .finish_non_exhaustive()
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `LOG_LEVEL` applies to this crate and
/// dependencies are kept at `warn`.
pub fn init_tracing(config: &ControllerConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,secret_sync_controller={}",
            config.log_level.to_lowercase()
        ))
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.log_format.eq_ignore_ascii_case("json") {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = installed {
        eprintln!("Tracing subscriber already installed: {e}");
    }
}

/// Initialize the controller runtime
///
/// # Errors
/// Fails when metrics cannot be registered, no Kubernetes client can be created,
/// or the backend client cannot be built.
pub async fn initialize(config: &ControllerConfig) -> Result<InitializationResult> {
    init_tracing(config);

    // Required for rustls 0.23+ before any TLS connection is made
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        info!("rustls crypto provider already installed");
    }

    info!("Starting Secret Sync Controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(?config, "Loaded configuration");

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = start_server(metrics_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let sources: Api<SecretSource> = Api::all(client.clone());

    let backend = VaultHttpClient::new(
        &config.backend_base_url,
        config.backend_token.clone(),
        config.backend_request_timeout(),
    )?;
    let store = KubeSecretStore::new(client.clone(), &config.annotation_prefix);
    let reconciler = Arc::new(Reconciler::new(Arc::new(backend), Arc::new(store)));

    let scheduler = RefreshScheduler::new(
        Arc::clone(&reconciler),
        Arc::new(KubeSourceCatalog::new(client)),
        config.refresh_interval(),
        config.refresh_initial_delay(),
        config.max_concurrent_refreshes,
    );

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        sources,
        reconciler,
        scheduler,
        server_state,
    })
}
