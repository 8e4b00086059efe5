//! Pact contract tests for the Vault HTTP API
//!
//! These tests define the contract between the Secret Sync Controller and Vault's
//! read endpoint. Pact provides a mock server that answers like Vault; the real
//! `VaultHttpClient` is pointed at it.

mod common;

use common::init_rustls;
use pact_consumer::prelude::*;
use secret_sync_controller::backend::{BackendClient, BackendError, VaultHttpClient};
use serde_json::json;
use std::time::Duration;

const TOKEN: &str = "test-token";

/// Client for a running mock server, with the `/v1` API prefix
fn client_for(mock_server_url: &str) -> VaultHttpClient {
    let mut base_url = mock_server_url.to_string();
    if base_url.ends_with('/') {
        base_url.pop();
    }
    VaultHttpClient::new(
        &format!("{base_url}/v1"),
        Some(TOKEN.to_string()),
        Duration::from_secs(5),
    )
    .expect("Failed to build Vault client")
}

#[tokio::test]
async fn test_vault_read_certificate_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Secret-Sync-Controller", "Vault");

    pact_builder.interaction("read a certificate bundle", "", |mut i| {
        i.given("a certificate is stored at pki/data/ingress");
        i.request
            .method("GET")
            .path("/v1/pki/data/ingress")
            .header("X-Vault-Token", TOKEN);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "request_id": "6cc090a8-3821-8244-73e4-5ab62b605587",
                "lease_id": "",
                "renewable": false,
                "lease_duration": 2_764_800,
                "data": {
                    "data": {
                        "certificate": "CERTIFICATE",
                        "issuing_ca": "ISSUINGCA",
                        "private_key": "PRIVATEKEY",
                        "ca_chain": ["ISSUINGCA"]
                    }
                }
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client_for(&mock_server.url().to_string());

    let payload = client
        .fetch("pki/data/ingress")
        .await
        .expect("Failed to fetch certificate");

    assert_eq!(payload.field("certificate"), Some("CERTIFICATE"));
    assert_eq!(payload.field("private_key"), Some("PRIVATEKEY"));
    assert_eq!(payload.field("issuing_ca"), Some("ISSUINGCA"));
    assert_eq!(payload.chain, Some(vec!["ISSUINGCA".to_string()]));
    assert!(payload.field("ca_chain").is_none());
    assert_eq!(payload.metadata.lease_duration, Some(2_764_800));
    assert_eq!(payload.metadata.lease_id, None);
}

#[tokio::test]
async fn test_vault_missing_path_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Secret-Sync-Controller", "Vault");

    pact_builder.interaction("read a path with no secret", "", |mut i| {
        i.given("nothing is stored at secret/data/missing");
        i.request
            .method("GET")
            .path("/v1/secret/data/missing")
            .header("X-Vault-Token", TOKEN);
        i.response
            .status(404)
            .header("content-type", "application/json")
            .json_body(json!({ "errors": [] }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client_for(&mock_server.url().to_string());

    let err = client.fetch("secret/data/missing").await.unwrap_err();
    assert!(matches!(err, BackendError::NotFound { ref path } if path == "secret/data/missing"));
    assert_eq!(
        err.to_string(),
        "secret at 'secret/data/missing' is not accessible: no data at path"
    );
}

#[tokio::test]
async fn test_vault_permission_denied_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Secret-Sync-Controller", "Vault");

    pact_builder.interaction("read a path the token may not read", "", |mut i| {
        i.given("the token has no policy for secret/data/locked");
        i.request
            .method("GET")
            .path("/v1/secret/data/locked")
            .header("X-Vault-Token", TOKEN);
        i.response
            .status(403)
            .header("content-type", "application/json")
            .json_body(json!({ "errors": ["permission denied"] }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client_for(&mock_server.url().to_string());

    let err = client.fetch("secret/data/locked").await.unwrap_err();
    assert!(matches!(err, BackendError::Unauthorized { status: 403, .. }));
}

#[tokio::test]
async fn test_vault_server_error_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Secret-Sync-Controller", "Vault");

    pact_builder.interaction("read while Vault is sealed", "", |mut i| {
        i.given("Vault is sealed");
        i.request
            .method("GET")
            .path("/v1/secret/data/app")
            .header("X-Vault-Token", TOKEN);
        i.response
            .status(503)
            .header("content-type", "application/json")
            .json_body(json!({ "errors": ["Vault is sealed"] }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client_for(&mock_server.url().to_string());

    let err = client.fetch("secret/data/app").await.unwrap_err();
    match err {
        BackendError::Rejected { status, body, .. } => {
            assert_eq!(status, 503);
            assert!(body.contains("Vault is sealed"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_vault_malformed_envelope_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Secret-Sync-Controller", "Vault");

    pact_builder.interaction("read a path returning a non-object secret", "", |mut i| {
        i.given("a proxy rewrites secret/data/app");
        i.request
            .method("GET")
            .path("/v1/secret/data/app")
            .header("X-Vault-Token", TOKEN);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "data": { "data": "not-an-object" } }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client_for(&mock_server.url().to_string());

    let err = client.fetch("secret/data/app").await.unwrap_err();
    assert!(matches!(err, BackendError::MalformedEnvelope { .. }));
}

#[tokio::test]
async fn test_vault_deleted_secret_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Secret-Sync-Controller", "Vault");

    pact_builder.interaction("read a soft-deleted KV v2 secret", "", |mut i| {
        i.given("the latest version of secret/data/app is deleted");
        i.request
            .method("GET")
            .path("/v1/secret/data/app")
            .header("X-Vault-Token", TOKEN);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "data": {
                    "data": null,
                    "metadata": { "deletion_time": "2024-01-01T00:00:00Z", "version": 3 }
                }
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client_for(&mock_server.url().to_string());

    let err = client.fetch("secret/data/app").await.unwrap_err();
    assert!(matches!(err, BackendError::NotFound { .. }));
}

#[tokio::test]
async fn test_empty_path_is_rejected_without_request() {
    init_rustls();
    let client = VaultHttpClient::new("http://127.0.0.1:1/v1", None, Duration::from_secs(1))
        .expect("Failed to build Vault client");

    let err = client.fetch("").await.unwrap_err();
    assert!(matches!(err, BackendError::InvalidPath));
}
