//! # Secret Store
//!
//! Where materialized secrets live. [`SecretStore`] is the seam between the
//! reconciler and Kubernetes; [`KubeSecretStore`] implements it with `Api<Secret>`.
//!
//! The compare and last-update annotations are explicit fields of
//! [`MaterializedSecret`] and travel in the same API call as the data, so no
//! reader can observe one without the other.
//!
//! A type change is the one write that takes two calls: delete, then create.
//! Between them the secret is absent, and if the create fails it stays absent until
//! the next reconciliation writes it again.

use crate::constants::{CONTROLLER_NAME, COMPARE_ANNOTATION, LAST_UPDATE_ANNOTATION};
use crate::controller::reconciler::SourceIdentity;
use crate::shaping::SecretClassification;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::ByteString;
use kube::api::{Api, DeleteParams, ObjectMeta, PostParams, Preconditions};
use kube::Client;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error, info};

/// A Kubernetes `Secret` as the controller sees it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterializedSecret {
    pub identity: SourceIdentity,
    /// Kubernetes `Secret.type`
    pub secret_type: String,
    pub data: BTreeMap<String, Vec<u8>>,
    /// Fingerprint of `data` at the time it was written
    pub compare: Option<String>,
    /// RFC 3339 timestamp of the last write
    pub last_update: Option<String>,
    /// Labels set by others, preserved across writes
    pub labels: BTreeMap<String, String>,
    /// Annotations other than compare / last-update, preserved across writes
    pub annotations: BTreeMap<String, String>,
    pub owner_references: Vec<OwnerReference>,
    /// Version the object was read at; used for optimistic concurrency on replace
    pub resource_version: Option<String>,
}

impl MaterializedSecret {
    #[must_use]
    pub fn classification(&self) -> Option<SecretClassification> {
        SecretClassification::from_type_str(Some(self.secret_type.as_str()))
    }

    /// True when this secret already holds data with `fingerprint` under `classification`
    #[must_use]
    pub fn is_current(&self, fingerprint: &str, classification: SecretClassification) -> bool {
        self.compare.as_deref() == Some(fingerprint)
            && self.classification() == Some(classification)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// The secret changed between read and write
    #[error("secret {identity} was modified concurrently")]
    Conflict { identity: String },
}

impl StoreError {
    fn from_write(identity: &SourceIdentity, error: kube::Error) -> Self {
        match error {
            kube::Error::Api(api_err) if api_err.code == 409 => StoreError::Conflict {
                identity: identity.to_string(),
            },
            other => StoreError::Kube(other),
        }
    }
}

/// Storage for materialized secrets
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the secret with the given identity, if it exists
    async fn get(&self, identity: &SourceIdentity)
        -> Result<Option<MaterializedSecret>, StoreError>;

    /// Write `desired` in one call, replacing `existing` entirely
    ///
    /// `existing` is the object the caller based its decision on; implementations
    /// use its version to reject writes that race with another writer.
    async fn upsert(
        &self,
        existing: Option<&MaterializedSecret>,
        desired: &MaterializedSecret,
    ) -> Result<(), StoreError>;
}

/// Kubernetes-backed secret store
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
    compare_key: String,
    last_update_key: String,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore")
            .field("compare_key", &self.compare_key)
            .field("last_update_key", &self.last_update_key)
            .finish_non_exhaustive()
    }
}

impl KubeSecretStore {
    #[must_use]
    pub fn new(client: Client, annotation_prefix: &str) -> Self {
        let prefix = annotation_prefix.trim_end_matches('/');
        Self {
            client,
            compare_key: format!("{prefix}{COMPARE_ANNOTATION}"),
            last_update_key: format!("{prefix}{LAST_UPDATE_ANNOTATION}"),
        }
    }

    fn api(&self, identity: &SourceIdentity) -> Api<Secret> {
        Api::namespaced(self.client.clone(), &identity.namespace)
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(CONTROLLER_NAME.to_string()),
            ..PostParams::default()
        }
    }

    fn to_materialized(&self, identity: &SourceIdentity, secret: Secret) -> MaterializedSecret {
        let mut annotations = secret.metadata.annotations.unwrap_or_default();
        let compare = annotations.remove(&self.compare_key);
        let last_update = annotations.remove(&self.last_update_key);

        MaterializedSecret {
            identity: identity.clone(),
            secret_type: secret.type_.unwrap_or_else(|| "Opaque".to_string()),
            data: secret
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k, v.0))
                .collect(),
            compare,
            last_update,
            labels: secret.metadata.labels.unwrap_or_default(),
            annotations,
            owner_references: secret.metadata.owner_references.unwrap_or_default(),
            resource_version: secret.metadata.resource_version,
        }
    }

    fn to_secret(&self, desired: &MaterializedSecret) -> Secret {
        let mut annotations = desired.annotations.clone();
        if let Some(compare) = &desired.compare {
            annotations.insert(self.compare_key.clone(), compare.clone());
        }
        if let Some(last_update) = &desired.last_update {
            annotations.insert(self.last_update_key.clone(), last_update.clone());
        }

        Secret {
            metadata: ObjectMeta {
                name: Some(desired.identity.name.clone()),
                namespace: Some(desired.identity.namespace.clone()),
                labels: (!desired.labels.is_empty()).then(|| desired.labels.clone()),
                annotations: Some(annotations),
                owner_references: (!desired.owner_references.is_empty())
                    .then(|| desired.owner_references.clone()),
                ..ObjectMeta::default()
            },
            type_: Some(desired.secret_type.clone()),
            data: Some(
                desired
                    .data
                    .iter()
                    .map(|(k, v)| (k.clone(), ByteString(v.clone())))
                    .collect(),
            ),
            ..Secret::default()
        }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(
        &self,
        identity: &SourceIdentity,
    ) -> Result<Option<MaterializedSecret>, StoreError> {
        let secret = self.api(identity).get_opt(&identity.name).await?;
        Ok(secret.map(|s| self.to_materialized(identity, s)))
    }

    async fn upsert(
        &self,
        existing: Option<&MaterializedSecret>,
        desired: &MaterializedSecret,
    ) -> Result<(), StoreError> {
        let identity = &desired.identity;
        let api = self.api(identity);
        let mut secret = self.to_secret(desired);
        let conflict = |e| StoreError::from_write(identity, e);

        match existing {
            None => {
                api.create(&Self::post_params(), &secret)
                    .await
                    .map_err(conflict)?;
                debug!(secret = %identity, "Created secret");
            }
            Some(previous) if previous.secret_type == desired.secret_type => {
                secret.metadata.resource_version = previous.resource_version.clone();
                api.replace(&identity.name, &Self::post_params(), &secret)
                    .await
                    .map_err(conflict)?;
                debug!(secret = %identity, "Replaced secret");
            }
            Some(previous) => {
                // Secret.type is immutable; the old object has to go first
                info!(
                    secret = %identity,
                    from = previous.secret_type.as_str(),
                    to = desired.secret_type.as_str(),
                    "Secret type changed, recreating secret"
                );
                let params = DeleteParams {
                    preconditions: Some(Preconditions {
                        resource_version: previous.resource_version.clone(),
                        uid: None,
                    }),
                    ..DeleteParams::default()
                };
                api.delete(&identity.name, &params)
                    .await
                    .map_err(conflict)?;
                if let Err(e) = api.create(&Self::post_params(), &secret).await {
                    error!(
                        secret = %identity,
                        deleted_type = previous.secret_type.as_str(),
                        desired_type = desired.secret_type.as_str(),
                        error = %e,
                        "Secret was deleted for a type change but could not be recreated"
                    );
                    return Err(conflict(e));
                }
            }
        }
        Ok(())
    }
}
