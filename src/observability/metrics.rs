//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `secret_sync_reconciliations_total{trigger}` - Reconciliations started, by event or scheduled trigger
//! - `secret_sync_reconciliation_errors_total{kind}` - Failed reconciliations by error kind
//! - `secret_sync_reconciliation_duration_seconds` - Duration of reconciliations
//! - `secret_sync_secrets_written_total{outcome}` - Secrets created or updated
//! - `secret_sync_secrets_unchanged_total` - Reconciliations that found the secret up to date
//! - `secret_sync_backend_request_duration_seconds{outcome}` - Backend request latency
//! - `secret_sync_backend_errors_total{kind}` - Backend failures by kind
//! - `secret_sync_refresh_sweeps_total` - Refresh sweeps completed
//! - `secret_sync_refresh_sweep_duration_seconds` - Duration of refresh sweeps
//! - `secret_sync_refresh_failures_total` - Sources that failed during a sweep
//! - `secret_sync_requeues_total{reason}` - Requeues scheduled by the error policy

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_sync_reconciliations_total",
            "Total number of reconciliations by trigger",
        ),
        &["trigger"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_sync_reconciliation_errors_total",
            "Total number of reconciliation errors by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "secret_sync_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static SECRETS_WRITTEN_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_sync_secrets_written_total",
            "Total number of Kubernetes secrets written by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create SECRETS_WRITTEN_TOTAL metric - this should never happen")
});

static SECRETS_UNCHANGED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_sync_secrets_unchanged_total",
        "Total number of reconciliations that found the secret up to date",
    )
    .expect("Failed to create SECRETS_UNCHANGED_TOTAL metric - this should never happen")
});

static BACKEND_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "secret_sync_backend_request_duration_seconds",
            "Duration of backend requests in seconds by outcome",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["outcome"],
    )
    .expect("Failed to create BACKEND_REQUEST_DURATION metric - this should never happen")
});

static BACKEND_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_sync_backend_errors_total",
            "Total number of backend errors by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create BACKEND_ERRORS_TOTAL metric - this should never happen")
});

static REFRESH_SWEEPS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_sync_refresh_sweeps_total",
        "Total number of completed refresh sweeps",
    )
    .expect("Failed to create REFRESH_SWEEPS_TOTAL metric - this should never happen")
});

static REFRESH_SWEEP_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "secret_sync_refresh_sweep_duration_seconds",
            "Duration of refresh sweeps in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )
    .expect("Failed to create REFRESH_SWEEP_DURATION metric - this should never happen")
});

static REFRESH_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_sync_refresh_failures_total",
        "Total number of sources that failed during a refresh sweep",
    )
    .expect("Failed to create REFRESH_FAILURES_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_sync_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Fails only when a metric is registered twice"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SECRETS_WRITTEN_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRETS_UNCHANGED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BACKEND_REQUEST_DURATION.clone()))?;
    REGISTRY.register(Box::new(BACKEND_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REFRESH_SWEEPS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REFRESH_SWEEP_DURATION.clone()))?;
    REGISTRY.register(Box::new(REFRESH_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(trigger: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[trigger]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_secrets_written(outcome: &str) {
    SECRETS_WRITTEN_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn increment_secrets_unchanged() {
    SECRETS_UNCHANGED_TOTAL.inc();
}

pub fn observe_backend_request(outcome: &str, duration: f64) {
    BACKEND_REQUEST_DURATION
        .with_label_values(&[outcome])
        .observe(duration);
}

pub fn increment_backend_errors(kind: &str) {
    BACKEND_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_refresh_sweep(duration: f64, failures: usize) {
    REFRESH_SWEEPS_TOTAL.inc();
    REFRESH_SWEEP_DURATION.observe(duration);
    REFRESH_FAILURES_TOTAL.inc_by(failures as u64);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
