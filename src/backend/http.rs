//! Vault HTTP client
//!
//! Native REST implementation of [`BackendClient`] over reqwest.
//! Reads `GET {base_url}/{path}` and authenticates with a static token header.

use super::{parse_envelope, BackendClient, BackendError, BackendSecretPayload};
use crate::constants::VAULT_TOKEN_HEADER;
use crate::observability::metrics;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, Instrument};

/// Vault REST client
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct VaultHttpClient {
    http_client: Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for VaultHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultHttpClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl VaultHttpClient {
    /// Create a client for `base_url` (e.g. `https://vault:8200/v1`)
    ///
    /// `timeout` bounds every request end to end, so a stalled backend cannot hold a
    /// reconciliation longer than that.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Full URL for a secret path
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get(&self, path: &str) -> Result<BackendSecretPayload, BackendError> {
        let mut request = self.http_client.get(self.url_for(path));
        if let Some(token) = &self.token {
            request = request.header(VAULT_TOKEN_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|source| BackendError::Unreachable {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| BackendError::Unreachable {
                path: path.to_string(),
                source,
            })?;

        match status {
            StatusCode::OK => parse_envelope(path, &body),
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Err(BackendError::NotFound {
                path: path.to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(BackendError::Unauthorized {
                    path: path.to_string(),
                    status: status.as_u16(),
                })
            }
            other => Err(BackendError::Rejected {
                path: path.to_string(),
                status: other.as_u16(),
                body: String::from_utf8_lossy(&body).chars().take(256).collect(),
            }),
        }
    }
}

#[async_trait]
impl BackendClient for VaultHttpClient {
    async fn fetch(&self, path: &str) -> Result<BackendSecretPayload, BackendError> {
        if path.trim().is_empty() {
            return Err(BackendError::InvalidPath);
        }

        let span = debug_span!("backend.fetch", secret.path = path);
        async move {
            let start = Instant::now();
            let result = self.get(path).await;
            let elapsed = start.elapsed().as_secs_f64();

            match &result {
                Ok(payload) => {
                    metrics::observe_backend_request("success", elapsed);
                    debug!(
                        fields = payload.fields.len(),
                        chain = payload.chain.as_ref().map_or(0, Vec::len),
                        "backend.fetch.ok"
                    );
                }
                Err(e) => {
                    metrics::observe_backend_request("error", elapsed);
                    metrics::increment_backend_errors(e.kind());
                    debug!(error = %e, "backend.fetch.failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }
}
