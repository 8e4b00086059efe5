//! # Backend
//!
//! Read-only access to the secret backend.
//!
//! The controller only ever needs one operation from the backend: read whatever is
//! stored at a path. [`BackendClient`] is that seam; [`VaultHttpClient`] implements it
//! against the Vault HTTP API and tests substitute scripted implementations.
//!
//! Every failure is a [`BackendError`]. The variants carry detail for logs and
//! metrics, but callers treat them alike: the secret cannot be retrieved right now.
//! The client never retries; retry policy belongs to the caller.

mod envelope;
mod http;

pub use envelope::parse_envelope;
pub use http::VaultHttpClient;

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Backend client trait
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Read the secret stored at `path`
    async fn fetch(&self, path: &str) -> Result<BackendSecretPayload, BackendError>;
}

/// Raw secret data returned by the backend for a path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendSecretPayload {
    /// Field name to string value, taken from `data.data`
    pub fields: BTreeMap<String, String>,
    /// CA chain, present when the payload carries a `ca_chain` array
    pub chain: Option<Vec<String>>,
    /// Store-assigned metadata, never part of change detection
    pub metadata: PayloadMetadata,
}

impl BackendSecretPayload {
    /// Build a payload from string fields only
    #[must_use]
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            chain: None,
            metadata: PayloadMetadata::default(),
        }
    }

    /// Attach a CA chain
    #[must_use]
    pub fn with_chain<I, S>(mut self, chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chain = Some(chain.into_iter().map(Into::into).collect());
        self
    }

    /// Look up a field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Lease and request information attached by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadMetadata {
    pub request_id: Option<String>,
    pub lease_id: Option<String>,
    pub lease_duration: Option<u64>,
    pub renewable: Option<bool>,
}

/// The secret at a path could not be retrieved
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("secret at '{path}' is not accessible: backend unreachable: {source}")]
    Unreachable {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("secret at '{path}' is not accessible: unauthorized (HTTP {status})")]
    Unauthorized { path: String, status: u16 },

    #[error("secret at '{path}' is not accessible: no data at path")]
    NotFound { path: String },

    #[error("secret at '{path}' is not accessible: HTTP {status}: {body}")]
    Rejected {
        path: String,
        status: u16,
        body: String,
    },

    #[error("secret at '{path}' is not accessible: malformed response: {reason}")]
    MalformedEnvelope { path: String, reason: String },

    #[error("secret path must not be empty")]
    InvalidPath,
}

impl BackendError {
    /// Short label for metrics and structured logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Unreachable { .. } => "unreachable",
            BackendError::Unauthorized { .. } => "unauthorized",
            BackendError::NotFound { .. } => "not_found",
            BackendError::Rejected { .. } => "rejected",
            BackendError::MalformedEnvelope { .. } => "malformed",
            BackendError::InvalidPath => "invalid_path",
        }
    }
}
