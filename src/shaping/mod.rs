//! # Shaping
//!
//! Pure transformation from a backend payload to the key/value layout and type of
//! the Kubernetes `Secret` that materializes it.
//!
//! Each supported secret type is one variant of [`SecretKind`]; [`shape`] dispatches
//! with an exhaustive match so adding a type is checked at compile time.
//! Identical input always yields byte-identical output.

mod certificate;
mod docker_config;
mod key_value;

use crate::backend::BackendSecretPayload;
use crate::crd::{DockerCfgConfig, KeyValueConfig};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Shaping strategy resolved from a SecretSource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretKind {
    KeyValue(KeyValueConfig),
    Certificate,
    DockerConfig(DockerCfgConfig),
}

/// Kubernetes `Secret.type` the shaped data is stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretClassification {
    Opaque,
    TlsKeyPair,
    DockerConfigJson,
}

impl SecretClassification {
    /// The `type` string Kubernetes uses for this classification
    #[must_use]
    pub fn as_type_str(&self) -> &'static str {
        match self {
            SecretClassification::Opaque => "Opaque",
            SecretClassification::TlsKeyPair => "kubernetes.io/tls",
            SecretClassification::DockerConfigJson => "kubernetes.io/dockerconfigjson",
        }
    }

    /// Reverse of [`Self::as_type_str`]; a missing type means `Opaque`
    #[must_use]
    pub fn from_type_str(secret_type: Option<&str>) -> Option<Self> {
        match secret_type.unwrap_or("Opaque") {
            "Opaque" | "" => Some(SecretClassification::Opaque),
            "kubernetes.io/tls" => Some(SecretClassification::TlsKeyPair),
            "kubernetes.io/dockerconfigjson" => Some(SecretClassification::DockerConfigJson),
            _ => None,
        }
    }
}

impl fmt::Display for SecretClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_type_str())
    }
}

/// Destination layout produced by [`shape`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedSecret {
    pub data: BTreeMap<String, Vec<u8>>,
    pub classification: SecretClassification,
}

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("unsupported secret type '{0}'")]
    UnsupportedType(String),

    #[error("required field '{field}' is missing from the backend payload")]
    MissingField { field: String },

    #[error("'{0}' is not a valid secret key")]
    InvalidKey(String),

    #[error("secret key '{0}' would be produced more than once")]
    DuplicateKey(String),
}

impl ShapeError {
    pub(crate) fn missing(field: &str) -> Self {
        ShapeError::MissingField {
            field: field.to_string(),
        }
    }
}

/// Shape `payload` according to `kind`
///
/// # Errors
/// Returns a [`ShapeError`] when the payload lacks a field the kind requires or
/// would produce keys Kubernetes rejects.
pub fn shape(payload: &BackendSecretPayload, kind: &SecretKind) -> Result<ShapedSecret, ShapeError> {
    match kind {
        SecretKind::KeyValue(config) => key_value::shape(payload, config),
        SecretKind::Certificate => certificate::shape(payload),
        SecretKind::DockerConfig(config) => docker_config::shape(payload, config),
    }
}

/// Kubernetes accepts `[-._a-zA-Z0-9]+` as secret data keys
pub(crate) fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
