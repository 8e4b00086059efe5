//! Generic key/value passthrough

use super::{is_valid_key, SecretClassification, ShapeError, ShapedSecret};
use crate::backend::BackendSecretPayload;
use crate::crd::KeyValueConfig;
use std::collections::BTreeMap;

/// Key under which a payload's CA chain is kept for KEYVALUE sources
const CHAIN_KEY: &str = "ca_chain";

pub(super) fn shape(
    payload: &BackendSecretPayload,
    config: &KeyValueConfig,
) -> Result<ShapedSecret, ShapeError> {
    let chain = payload.chain.as_ref().map(|entries| entries.join("\n"));
    let entries = payload
        .fields
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .chain(chain.as_deref().map(|joined| (CHAIN_KEY, joined)));

    let mut data = BTreeMap::new();
    for (name, value) in entries {
        let key = config.aliases.get(name).map_or(name, String::as_str);
        if !is_valid_key(key) {
            return Err(ShapeError::InvalidKey(key.to_string()));
        }
        if data.insert(key.to_string(), value.as_bytes().to_vec()).is_some() {
            return Err(ShapeError::DuplicateKey(key.to_string()));
        }
    }

    Ok(ShapedSecret {
        data,
        classification: SecretClassification::Opaque,
    })
}
