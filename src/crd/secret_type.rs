//! # Secret Types
//!
//! The declared `type` of a SecretSource and the per-type parameters.

use crate::shaping::ShapeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Supported values of `spec.type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretType {
    /// Generic key/value passthrough
    KeyValue,
    /// Certificate bundle assembled into a TLS keypair
    Cert,
    /// Registry credentials rendered as `.dockerconfigjson`
    DockerCfg,
}

impl SecretType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretType::KeyValue => "KEYVALUE",
            SecretType::Cert => "CERT",
            SecretType::DockerCfg => "DOCKERCFG",
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretType {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-'))
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "KEYVALUE" => Ok(SecretType::KeyValue),
            "CERT" | "CERTIFICATE" => Ok(SecretType::Cert),
            "DOCKERCFG" => Ok(SecretType::DockerCfg),
            _ => Err(ShapeError::UnsupportedType(s.to_string())),
        }
    }
}

/// Parameters for KEYVALUE sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyValueConfig {
    /// Rename backend fields: `{ backendField: secretKey }`
    /// Fields without an alias keep their backend name
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// Parameters for DOCKERCFG sources, naming the backend fields to read
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DockerCfgConfig {
    /// Field holding the registry URL (default: `url`)
    #[serde(default = "default_registry_field")]
    pub registry_field: String,
    /// Field holding the user name (default: `username`)
    #[serde(default = "default_username_field")]
    pub username_field: String,
    /// Field holding the password (default: `password`)
    #[serde(default = "default_password_field")]
    pub password_field: String,
    /// Optional field holding the e-mail address (default: `email`)
    #[serde(default = "default_email_field")]
    pub email_field: String,
}

impl Default for DockerCfgConfig {
    fn default() -> Self {
        Self {
            registry_field: default_registry_field(),
            username_field: default_username_field(),
            password_field: default_password_field(),
            email_field: default_email_field(),
        }
    }
}

fn default_registry_field() -> String {
    "url".to_string()
}

fn default_username_field() -> String {
    "username".to_string()
}

fn default_password_field() -> String {
    "password".to_string()
}

fn default_email_field() -> String {
    "email".to_string()
}
