//! # Refresh Scheduler
//!
//! Periodic sweep that catches backend changes no Kubernetes event announces.
//!
//! After an initial delay the scheduler lists every SecretSource through a
//! [`SourceCatalog`] and refreshes each through the same [`Reconciler`] the event
//! path uses. One failing source never stops the sweep; failures are logged and
//! counted. The shutdown signal is observed between sweeps, so an in-flight sweep
//! always runs to completion.

use crate::controller::reconciler::{ReconcileOutcome, Reconciler, ReconcilerError};
use crate::crd::SecretSource;
use crate::observability::metrics;
use async_trait::async_trait;
use futures::{stream, StreamExt};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn, Instrument};

/// Every SecretSource currently known to the cluster
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// # Errors
    /// Returns an error when the listing cannot be obtained.
    async fn list(&self) -> anyhow::Result<Vec<SecretSource>>;
}

/// Lists SecretSources across all namespaces through the API server
#[derive(Clone)]
pub struct KubeSourceCatalog {
    api: Api<SecretSource>,
}

impl std::fmt::Debug for KubeSourceCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSourceCatalog").finish_non_exhaustive()
    }
}

impl KubeSourceCatalog {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl SourceCatalog for KubeSourceCatalog {
    async fn list(&self) -> anyhow::Result<Vec<SecretSource>> {
        Ok(self.api.list(&ListParams::default()).await?.items)
    }
}

/// Tally of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sources whose secret was created or updated
    pub refreshed: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl SweepReport {
    fn record(&mut self, result: &Result<ReconcileOutcome, ReconcilerError>) {
        match result {
            Ok(outcome) if outcome.wrote() => self.refreshed += 1,
            Ok(_) => self.unchanged += 1,
            Err(_) => self.failed += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.refreshed + self.unchanged + self.failed
    }
}

pub struct RefreshScheduler {
    reconciler: Arc<Reconciler>,
    catalog: Arc<dyn SourceCatalog>,
    interval: Duration,
    initial_delay: Duration,
    max_concurrent: usize,
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("interval", &self.interval)
            .field("initial_delay", &self.initial_delay)
            .field("max_concurrent", &self.max_concurrent)
            .finish_non_exhaustive()
    }
}

impl RefreshScheduler {
    #[must_use]
    pub fn new(
        reconciler: Arc<Reconciler>,
        catalog: Arc<dyn SourceCatalog>,
        interval: Duration,
        initial_delay: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            reconciler,
            catalog,
            interval,
            initial_delay,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Sweep until `shutdown` flips to `true` or its sender is dropped
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            initial_delay_secs = self.initial_delay.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Refresh scheduler started"
        );

        // Pinned so a wake-up that is not a shutdown keeps the current deadline
        let sleep = tokio::time::sleep(self.initial_delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let report = self.sweep().await;
            debug!(?report, "Refresh sweep finished");
            sleep
                .as_mut()
                .reset(tokio::time::Instant::now() + self.interval);

            if *shutdown.borrow() {
                break;
            }
        }

        info!("Refresh scheduler stopped");
    }

    /// Refresh every known source once
    ///
    /// A failed listing skips the sweep and yields an empty report.
    pub async fn sweep(&self) -> SweepReport {
        let span = tracing::info_span!("refresh.sweep");
        async {
            let start = Instant::now();
            let sources = match self.catalog.list().await {
                Ok(sources) => sources,
                Err(e) => {
                    error!(error = %e, "Failed to list SecretSources, skipping refresh sweep");
                    return SweepReport::default();
                }
            };

            let mut report = SweepReport::default();
            let mut results = stream::iter(sources)
                .map(|source| {
                    let reconciler = Arc::clone(&self.reconciler);
                    async move {
                        let result = reconciler.refresh(&source).await;
                        if let Err(e) = &result {
                            let namespace = source.namespace().unwrap_or_default();
                            let name = source.name_any();
                            warn!(
                                resource.namespace = namespace.as_str(),
                                resource.name = name.as_str(),
                                error.kind = e.kind(),
                                error = %e,
                                "Refresh failed, continuing sweep"
                            );
                        }
                        result
                    }
                })
                .buffer_unordered(self.max_concurrent);

            while let Some(result) = results.next().await {
                report.record(&result);
            }

            metrics::observe_refresh_sweep(start.elapsed().as_secs_f64(), report.failed);
            info!(
                sources = report.total(),
                refreshed = report.refreshed,
                unchanged = report.unchanged,
                failed = report.failed,
                "Refresh sweep complete"
            );
            report
        }
        .instrument(span)
        .await
    }
}
