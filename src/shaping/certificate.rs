//! Certificate bundle to TLS keypair
//!
//! `tls.crt` is the leaf followed by every CA of the chain in backend order, one
//! newline between entries. `tls.key` is the private key verbatim.

use super::{SecretClassification, ShapeError, ShapedSecret};
use crate::backend::BackendSecretPayload;
use std::collections::BTreeMap;

pub const TLS_CERT_KEY: &str = "tls.crt";
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

const CERTIFICATE_FIELD: &str = "certificate";
const PRIVATE_KEY_FIELD: &str = "private_key";

pub(super) fn shape(payload: &BackendSecretPayload) -> Result<ShapedSecret, ShapeError> {
    let certificate = payload
        .field(CERTIFICATE_FIELD)
        .ok_or_else(|| ShapeError::missing(CERTIFICATE_FIELD))?;
    let private_key = payload
        .field(PRIVATE_KEY_FIELD)
        .ok_or_else(|| ShapeError::missing(PRIVATE_KEY_FIELD))?;

    let chain = payload.chain.as_deref().unwrap_or_default();
    let bundle = std::iter::once(certificate)
        .chain(chain.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join("\n");

    let data = BTreeMap::from([
        (TLS_CERT_KEY.to_string(), bundle.into_bytes()),
        (
            TLS_PRIVATE_KEY_KEY.to_string(),
            private_key.as_bytes().to_vec(),
        ),
    ]);

    Ok(ShapedSecret {
        data,
        classification: SecretClassification::TlsKeyPair,
    })
}
