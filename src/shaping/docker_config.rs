//! Registry credentials to `.dockerconfigjson`

use super::{SecretClassification, ShapeError, ShapedSecret};
use crate::backend::BackendSecretPayload;
use crate::crd::DockerCfgConfig;
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

pub const DOCKER_CONFIG_KEY: &str = ".dockerconfigjson";

pub(super) fn shape(
    payload: &BackendSecretPayload,
    config: &DockerCfgConfig,
) -> Result<ShapedSecret, ShapeError> {
    let required = |field: &str| {
        payload
            .field(field)
            .ok_or_else(|| ShapeError::missing(field))
    };
    let registry = required(&config.registry_field)?;
    let username = required(&config.username_field)?;
    let password = required(&config.password_field)?;

    let mut entry = Map::new();
    entry.insert("username".to_string(), json!(username));
    entry.insert("password".to_string(), json!(password));
    if let Some(email) = payload.field(&config.email_field) {
        entry.insert("email".to_string(), json!(email));
    }
    entry.insert(
        "auth".to_string(),
        json!(general_purpose::STANDARD.encode(format!("{username}:{password}"))),
    );

    let mut auths = Map::new();
    auths.insert(registry.to_string(), Value::Object(entry));
    let document = json!({ "auths": auths });

    Ok(ShapedSecret {
        data: BTreeMap::from([(DOCKER_CONFIG_KEY.to_string(), document.to_string().into_bytes())]),
        classification: SecretClassification::DockerConfigJson,
    })
}
