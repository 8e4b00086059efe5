//! # Fingerprint
//!
//! Stable digest over shaped secret data, stored in the compare annotation.
//!
//! Entries are hashed in key order, each one length-prefixed and terminated by a
//! record separator, so neither map ordering nor a shift of bytes between key and
//! value can produce the same digest for different data.

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

const KEY_VALUE_SEPARATOR: u8 = 0x00;
const RECORD_SEPARATOR: u8 = 0x1e;

/// SHA-256 over the canonical form of `data`, base64 encoded (44 characters)
#[must_use]
pub fn fingerprint(data: &BTreeMap<String, Vec<u8>>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in data {
        hasher.update((key.len() as u64).to_be_bytes());
        hasher.update(key.as_bytes());
        hasher.update([KEY_VALUE_SEPARATOR]);
        hasher.update((value.len() as u64).to_be_bytes());
        hasher.update(value);
        hasher.update([RECORD_SEPARATOR]);
    }
    general_purpose::STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(entries: &[(&str, &str)]) -> BTreeMap<String, Vec<u8>> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn test_fingerprint_is_stable_and_printable() {
        let a = fingerprint(&data(&[("tls.crt", "CERTIFICATE\nISSUINGCA"), ("tls.key", "PRIVATEKEY")]));
        let b = fingerprint(&data(&[("tls.crt", "CERTIFICATE\nISSUINGCA"), ("tls.key", "PRIVATEKEY")]));
        assert_eq!(a, b);
        assert_eq!(a.len(), 44);
        assert!(a.is_ascii());
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut forward = BTreeMap::new();
        forward.insert("a".to_string(), b"1".to_vec());
        forward.insert("b".to_string(), b"2".to_vec());
        let mut backward = BTreeMap::new();
        backward.insert("b".to_string(), b"2".to_vec());
        backward.insert("a".to_string(), b"1".to_vec());
        assert_eq!(fingerprint(&forward), fingerprint(&backward));
    }

    #[test]
    fn test_any_value_or_key_change_is_detected() {
        let base = fingerprint(&data(&[("tls.crt", "CERTIFICATE"), ("tls.key", "K")]));
        assert_ne!(
            base,
            fingerprint(&data(&[("tls.crt", "CERTIFICATECHANGE"), ("tls.key", "K")]))
        );
        assert_ne!(
            base,
            fingerprint(&data(&[("tls.cert", "CERTIFICATE"), ("tls.key", "K")]))
        );
        assert_ne!(base, fingerprint(&data(&[("tls.crt", "CERTIFICATE")])));
    }

    #[test]
    fn test_boundary_shift_between_key_and_value_is_detected() {
        assert_ne!(
            fingerprint(&data(&[("ab", "c")])),
            fingerprint(&data(&[("a", "bc")]))
        );
    }

    #[test]
    fn test_empty_data_has_a_fingerprint() {
        assert_eq!(fingerprint(&BTreeMap::new()).len(), 44);
    }
}
