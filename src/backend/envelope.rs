//! # Response Envelope
//!
//! Vault wraps secret data in an envelope with lease metadata:
//!
//! ```json
//! {
//!   "request_id": "6cc090a8-3821-8244-73e4-5ab62b605587",
//!   "lease_id": "",
//!   "renewable": false,
//!   "lease_duration": 2764800,
//!   "data": { "data": { "certificate": "...", "ca_chain": ["..."] } }
//! }
//! ```

use super::{BackendError, BackendSecretPayload, PayloadMetadata};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Field that carries the CA chain for certificate payloads
const CHAIN_FIELD: &str = "ca_chain";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    lease_id: Option<String>,
    #[serde(default)]
    lease_duration: Option<u64>,
    #[serde(default)]
    renewable: Option<bool>,
    data: Option<Inner>,
}

#[derive(Debug, Deserialize)]
struct Inner {
    #[serde(default)]
    data: Value,
}

/// Parse a successful response body for `path` into a payload
///
/// # Errors
/// - [`BackendError::MalformedEnvelope`] when the body is not JSON, lacks `data`,
///   or `data.data` is neither an object nor null
/// - [`BackendError::NotFound`] when `data.data` is null (nothing stored at the path)
pub fn parse_envelope(path: &str, body: &[u8]) -> Result<BackendSecretPayload, BackendError> {
    let malformed = |reason: String| BackendError::MalformedEnvelope {
        path: path.to_string(),
        reason,
    };

    let envelope: Envelope = serde_json::from_slice(body).map_err(|e| malformed(e.to_string()))?;
    let inner = envelope
        .data
        .ok_or_else(|| malformed("missing 'data' object".to_string()))?;

    let object = match inner.data {
        Value::Object(object) => object,
        Value::Null => {
            return Err(BackendError::NotFound {
                path: path.to_string(),
            })
        }
        other => {
            return Err(malformed(format!(
                "'data.data' must be an object, got {}",
                json_type(&other)
            )))
        }
    };

    let mut fields = BTreeMap::new();
    let mut chain = None;
    for (name, value) in object {
        match value {
            Value::Array(items) if name == CHAIN_FIELD => {
                let entries = items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => Ok(s),
                        other => Err(malformed(format!(
                            "'{CHAIN_FIELD}' entries must be strings, got {}",
                            json_type(&other)
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                chain = Some(entries);
            }
            Value::String(s) => {
                fields.insert(name, s);
            }
            Value::Null => {}
            other => {
                fields.insert(name, other.to_string());
            }
        }
    }

    Ok(BackendSecretPayload {
        fields,
        chain,
        metadata: PayloadMetadata {
            request_id: envelope.request_id,
            lease_id: envelope.lease_id.filter(|id| !id.is_empty()),
            lease_duration: envelope.lease_duration,
            renewable: envelope.renewable,
        },
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn test_certificate_envelope() {
        let raw = json!({
            "request_id": "6cc090a8-3821-8244-73e4-5ab62b605587",
            "lease_id": "",
            "renewable": false,
            "lease_duration": 2_764_800,
            "data": { "data": {
                "certificate": "CERTIFICATE",
                "issuing_ca": "ISSUINGCA",
                "ca_chain": ["ISSUINGCA"],
                "private_key": "PRIVATEKEY"
            }},
            "wrap_info": null,
            "warnings": null,
            "auth": null
        });

        let payload = parse_envelope("secret/certificate", &body(&raw)).unwrap();
        assert_eq!(payload.field("certificate"), Some("CERTIFICATE"));
        assert_eq!(payload.field("private_key"), Some("PRIVATEKEY"));
        assert_eq!(payload.field("ca_chain"), None);
        assert_eq!(payload.chain, Some(vec!["ISSUINGCA".to_string()]));
        assert_eq!(payload.metadata.lease_duration, Some(2_764_800));
        assert_eq!(payload.metadata.lease_id, None);
    }

    #[test]
    fn test_scalars_are_kept_as_text() {
        let raw = json!({ "data": { "data": { "port": 5432, "tls": true, "gone": null } } });
        let payload = parse_envelope("secret/db", &body(&raw)).unwrap();
        assert_eq!(payload.field("port"), Some("5432"));
        assert_eq!(payload.field("tls"), Some("true"));
        assert!(!payload.fields.contains_key("gone"));
    }

    #[test]
    fn test_null_inner_data_is_not_found() {
        let raw = json!({ "data": { "data": null, "metadata": { "deletion_time": "x" } } });
        let err = parse_envelope("secret/deleted", &body(&raw)).unwrap_err();
        assert!(matches!(err, BackendError::NotFound { .. }));
    }

    #[test]
    fn test_missing_data_is_malformed() {
        let raw = json!({ "errors": [] });
        let err = parse_envelope("secret/app", &body(&raw)).unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn test_non_json_body_is_malformed() {
        let err = parse_envelope("secret/app", b"<html>gateway</html>").unwrap_err();
        assert_eq!(err.kind(), "malformed");
        assert!(err.to_string().contains("secret at 'secret/app' is not accessible"));
    }

    #[test]
    fn test_chain_with_non_string_entry_is_malformed() {
        let raw = json!({ "data": { "data": { "certificate": "C", "ca_chain": ["A", 1] } } });
        let err = parse_envelope("pki/cert", &body(&raw)).unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }
}
