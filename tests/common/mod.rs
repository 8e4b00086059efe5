//! Common test utilities
//!
//! In-memory stand-ins for the backend, the Kubernetes secret store and the
//! SecretSource catalog, plus builders for sources and payloads.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use async_trait::async_trait;
use secret_sync_controller::backend::{BackendClient, BackendError, BackendSecretPayload};
use secret_sync_controller::controller::reconciler::SourceIdentity;
use secret_sync_controller::controller::scheduler::SourceCatalog;
use secret_sync_controller::controller::store::{MaterializedSecret, SecretStore, StoreError};
use secret_sync_controller::crd::{SecretSource, SecretSourceSpec};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

pub const NAMESPACE: &str = "default";

/// SecretSource with a uid so owner references can be derived
pub fn source(name: &str, secret_type: &str, path: &str) -> SecretSource {
    let mut source = SecretSource::new(
        name,
        SecretSourceSpec {
            path: path.to_string(),
            secret_type: secret_type.to_string(),
            key_value: None,
            docker_cfg: None,
        },
    );
    source.metadata.namespace = Some(NAMESPACE.to_string());
    source.metadata.uid = Some(format!("uid-{name}"));
    source
}

pub fn identity(name: &str) -> SourceIdentity {
    SourceIdentity::new(NAMESPACE, name)
}

/// PKI-style payload with a single-entry chain
pub fn certificate_payload(certificate: &str) -> BackendSecretPayload {
    BackendSecretPayload::from_fields([
        ("certificate", certificate),
        ("issuing_ca", "ISSUINGCA"),
        ("private_key", "PRIVATEKEY"),
    ])
    .with_chain(["ISSUINGCA"])
}

#[derive(Debug, Clone)]
enum Script {
    Payload(BackendSecretPayload),
    NotFound,
    Unauthorized,
}

/// Backend answering from a per-path script; unknown paths are not found
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, Script>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps for `delay` before answering
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn set(&self, path: &str, payload: BackendSecretPayload) {
        self.script(path, Script::Payload(payload));
    }

    pub fn fail_not_found(&self, path: &str) {
        self.script(path, Script::NotFound);
    }

    pub fn fail_unauthorized(&self, path: &str) {
        self.script(path, Script::Unauthorized);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn script(&self, path: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(path.to_string(), script);
    }
}

#[async_trait]
impl BackendClient for ScriptedBackend {
    async fn fetch(&self, path: &str) -> Result<BackendSecretPayload, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let script = self.scripts.lock().unwrap().get(path).cloned();
        match script {
            Some(Script::Payload(payload)) => Ok(payload),
            Some(Script::Unauthorized) => Err(BackendError::Unauthorized {
                path: path.to_string(),
                status: 403,
            }),
            Some(Script::NotFound) | None => Err(BackendError::NotFound {
                path: path.to_string(),
            }),
        }
    }
}

/// Secret store with optimistic concurrency on a version counter
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: Mutex<HashMap<SourceIdentity, MaterializedSecret>>,
    versions: AtomicU64,
    writes: AtomicUsize,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a secret as if something else had written it
    pub fn insert(&self, mut secret: MaterializedSecret) {
        secret.resource_version = Some(self.next_version());
        self.secrets
            .lock()
            .unwrap()
            .insert(secret.identity.clone(), secret);
    }

    pub fn secret(&self, identity: &SourceIdentity) -> Option<MaterializedSecret> {
        self.secrets.lock().unwrap().get(identity).cloned()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn next_version(&self) -> String {
        (self.versions.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(
        &self,
        identity: &SourceIdentity,
    ) -> Result<Option<MaterializedSecret>, StoreError> {
        Ok(self.secret(identity))
    }

    async fn upsert(
        &self,
        existing: Option<&MaterializedSecret>,
        desired: &MaterializedSecret,
    ) -> Result<(), StoreError> {
        let mut secrets = self.secrets.lock().unwrap();
        let stored_version = secrets
            .get(&desired.identity)
            .and_then(|s| s.resource_version.clone());
        let expected_version = existing.and_then(|s| s.resource_version.clone());
        if stored_version != expected_version {
            return Err(StoreError::Conflict {
                identity: desired.identity.to_string(),
            });
        }

        let mut stored = desired.clone();
        stored.resource_version = Some(self.next_version());
        secrets.insert(desired.identity.clone(), stored);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fixed list of sources, or a listing failure
#[derive(Debug, Default)]
pub struct StaticCatalog {
    pub sources: Vec<SecretSource>,
    pub fail: bool,
}

#[async_trait]
impl SourceCatalog for StaticCatalog {
    async fn list(&self) -> anyhow::Result<Vec<SecretSource>> {
        if self.fail {
            anyhow::bail!("API server unavailable");
        }
        Ok(self.sources.clone())
    }
}
