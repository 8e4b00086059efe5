//! # SecretSource Spec
//!
//! Main CRD specification type.

use crate::crd::{DockerCfgConfig, KeyValueConfig, SecretType};
use crate::shaping::{SecretKind, ShapeError};
use serde::{Deserialize, Serialize};

/// SecretSource Custom Resource Definition
///
/// Declares a Vault path and how its payload should be shaped into a Kubernetes
/// `Secret` of the same name and namespace.
///
/// # Example
///
/// ```yaml
/// apiVersion: secret-sync.octopilot.io/v1
/// kind: SecretSource
/// metadata:
///   name: ingress-certificate
///   namespace: default
/// spec:
///   type: CERT
///   path: pki/data/ingress
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "SecretSource",
    group = "secret-sync.octopilot.io",
    version = "v1",
    namespaced,
    shortname = "ss",
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}, {"name":"Path", "type":"string", "jsonPath":".spec.path"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SecretSourceSpec {
    /// Backend path to read, relative to the configured base URL (e.g. `secret/data/app`)
    pub path: String,
    /// Shaping strategy: KEYVALUE, CERT or DOCKERCFG
    /// Kept as a string so an unknown value surfaces as a reconcile error
    /// instead of making the whole resource unreadable
    #[serde(rename = "type")]
    pub secret_type: String,
    /// Options for KEYVALUE sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_value: Option<KeyValueConfig>,
    /// Options for DOCKERCFG sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_cfg: Option<DockerCfgConfig>,
}

impl SecretSourceSpec {
    /// Resolve the declared type and its parameters into a shaping strategy
    ///
    /// # Errors
    /// Returns [`ShapeError::UnsupportedType`] when `type` names no known strategy.
    pub fn kind(&self) -> Result<SecretKind, ShapeError> {
        let secret_type: SecretType = self.secret_type.parse()?;
        Ok(match secret_type {
            SecretType::KeyValue => SecretKind::KeyValue(self.key_value.clone().unwrap_or_default()),
            SecretType::Cert => SecretKind::Certificate,
            SecretType::DockerCfg => {
                SecretKind::DockerConfig(self.docker_cfg.clone().unwrap_or_default())
            }
        })
    }
}
