//! # Reconciliation Logic
//!
//! Fetch, shape, fingerprint, compare, write. Both the event path and the
//! refresh scheduler go through [`Reconciler::reconcile`] so they share one
//! per-identity lock and one write path.

use crate::controller::fingerprint::fingerprint;
use crate::controller::reconciler::types::{
    ReconcileOutcome, Reconciler, ReconcilerError, SourceIdentity, TriggerSource,
};
use crate::controller::store::MaterializedSecret;
use crate::crd::SecretSource;
use crate::observability::metrics;
use crate::shaping::{shape, ShapedSecret};
use chrono::{SecondsFormat, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use std::time::Instant;
use tracing::{debug, info, Instrument};

/// A source's desired state next to what is currently stored
#[derive(Debug)]
struct Evaluation {
    identity: SourceIdentity,
    existing: Option<MaterializedSecret>,
    shaped: ShapedSecret,
    fingerprint: String,
}

impl Evaluation {
    fn is_current(&self) -> bool {
        self.existing.as_ref().is_some_and(|secret| {
            secret.is_current(&self.fingerprint, self.shaped.classification)
        })
    }

    /// Split into the stored secret and the one that should replace it
    fn into_desired(
        self,
        owner: Option<OwnerReference>,
    ) -> (Option<MaterializedSecret>, MaterializedSecret) {
        let (labels, annotations, mut owner_references) = match &self.existing {
            Some(existing) => (
                existing.labels.clone(),
                existing.annotations.clone(),
                existing.owner_references.clone(),
            ),
            None => Default::default(),
        };
        if let Some(owner) = owner {
            owner_references.retain(|r| r.uid != owner.uid);
            owner_references.push(owner);
        }

        let desired = MaterializedSecret {
            identity: self.identity,
            secret_type: self.shaped.classification.as_type_str().to_string(),
            data: self.shaped.data,
            compare: Some(self.fingerprint),
            last_update: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            labels,
            annotations,
            owner_references,
            resource_version: None,
        };
        (self.existing, desired)
    }
}

impl Reconciler {
    /// Handle a SecretSource add or update event
    ///
    /// # Errors
    /// Backend and shaping failures are returned unchanged and nothing is written.
    pub async fn add_handler(
        &self,
        source: &SecretSource,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        self.reconcile(source, TriggerSource::Event).await
    }

    /// Refresh a source from the periodic sweep
    ///
    /// Evaluates once under the identity lock and writes with the payload it already
    /// fetched, so the backend is read a single time per source per sweep.
    ///
    /// # Errors
    /// Same as [`Self::add_handler`].
    pub async fn refresh(
        &self,
        source: &SecretSource,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        self.reconcile(source, TriggerSource::Scheduled).await
    }

    /// Whether the stored secret differs from what the backend currently holds
    ///
    /// True when no secret exists, its compare annotation differs from the fresh
    /// fingerprint, or its type differs from the desired classification. A missing
    /// secret answers without contacting the backend. Read-only.
    ///
    /// # Errors
    /// Store read failures, then backend and shaping failures.
    pub async fn refresh_is_needed(&self, source: &SecretSource) -> Result<bool, ReconcilerError> {
        let identity = SourceIdentity::of(source)?;
        let Some(existing) = self.store.get(&identity).await? else {
            debug!(secret = %identity, "No materialized secret, refresh needed");
            return Ok(true);
        };
        let (shaped, fingerprint) = self.fetch_shaped(source).await?;
        Ok(!existing.is_current(&fingerprint, shaped.classification))
    }

    /// Bring the materialized secret for `source` in line with the backend
    ///
    /// # Errors
    /// Any failure of fetch, shape, read or write. A failure before the write leaves
    /// the stored secret untouched.
    pub async fn reconcile(
        &self,
        source: &SecretSource,
        trigger: TriggerSource,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        let identity = SourceIdentity::of(source)?;
        let span = tracing::info_span!(
            "reconcile",
            resource.namespace = identity.namespace.as_str(),
            resource.name = identity.name.as_str(),
            secret_type = source.spec.secret_type.as_str(),
            trigger = trigger.as_str(),
        );

        let start = Instant::now();
        metrics::increment_reconciliations(trigger.as_str());
        let result = self
            .reconcile_locked(identity, source)
            .instrument(span)
            .await;
        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

        match &result {
            Ok(outcome) if outcome.wrote() => metrics::increment_secrets_written(outcome.as_str()),
            Ok(_) => metrics::increment_secrets_unchanged(),
            Err(e) => metrics::increment_reconciliation_errors(e.kind()),
        }
        result
    }

    async fn reconcile_locked(
        &self,
        identity: SourceIdentity,
        source: &SecretSource,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        let lock = self.get_operation_lock(&identity);
        let _guard = lock.lock().await;

        let evaluation = self.evaluate(identity, source).await?;
        if evaluation.is_current() {
            debug!(
                fingerprint = evaluation.fingerprint.as_str(),
                "Secret is up to date"
            );
            return Ok(ReconcileOutcome::Unchanged);
        }

        let (existing, desired) = evaluation.into_desired(source.controller_owner_ref(&()));
        self.store.upsert(existing.as_ref(), &desired).await?;

        let outcome = if existing.is_some() {
            ReconcileOutcome::Updated
        } else {
            ReconcileOutcome::Created
        };
        info!(
            secret = %desired.identity,
            secret_type = desired.secret_type.as_str(),
            keys = desired.data.len(),
            outcome = outcome.as_str(),
            "Synchronized secret"
        );
        Ok(outcome)
    }

    async fn evaluate(
        &self,
        identity: SourceIdentity,
        source: &SecretSource,
    ) -> Result<Evaluation, ReconcilerError> {
        let (shaped, fingerprint) = self.fetch_shaped(source).await?;
        let existing = self.store.get(&identity).await?;

        Ok(Evaluation {
            identity,
            existing,
            shaped,
            fingerprint,
        })
    }

    /// Resolve the kind before fetching so an unsupported type never reaches the backend
    async fn fetch_shaped(
        &self,
        source: &SecretSource,
    ) -> Result<(ShapedSecret, String), ReconcilerError> {
        let kind = source.spec.kind()?;
        let payload = self.backend.fetch(&source.spec.path).await?;
        let shaped = shape(&payload, &kind)?;
        let fingerprint = fingerprint(&shaped.data);
        Ok((shaped, fingerprint))
    }
}
