//! Encrypted scalar handling.
//!
//! Config files may carry ciphertext in two equivalent forms: a YAML
//! `!encrypted <base64>` tagged scalar (rewritten by the format adapter into the
//! explicit form) or an `AES256GCM:<keyId>:<base64>` string, usable from any
//! source. This module only *locates* those scalars and hands them to a
//! [`SecretStore`]; decryption itself lives behind that trait, outside this crate.

use crate::error::{ConfigError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

/// Cipher scheme marker at the front of the explicit string form.
pub const ENCRYPTED_SCHEME: &str = "AES256GCM";

/// One located ciphertext scalar, still encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedValue {
    /// Key identifier, when the file names one (`AES256GCM:prod-key:...`).
    pub key_id: Option<String>,
    /// Base64 of nonce followed by ciphertext.
    pub payload: String,
}

/// External decryption collaborator (keychain, OS secret service, ...).
pub trait SecretStore: Send + Sync {
    /// Decrypt a located value, returning the plaintext scalar.
    fn decrypt(&self, value: &EncryptedValue) -> std::result::Result<String, String>;
}

/// The explicit string form for a tagged payload with no key id.
pub fn tagged_form(payload: &str) -> String {
    format!("{ENCRYPTED_SCHEME}::{payload}")
}

/// Parse the explicit `AES256GCM:<keyId>:<base64>` form.
///
/// Returns `None` for ordinary strings, including ones that carry the scheme
/// prefix but no well-formed base64 payload — those are left untouched rather
/// than guessed at.
pub fn parse_encrypted(s: &str) -> Option<EncryptedValue> {
    let rest = s.strip_prefix(ENCRYPTED_SCHEME)?.strip_prefix(':')?;
    let (key_id, payload) = rest.split_once(':')?;
    if payload.is_empty() || BASE64.decode(payload).is_err() {
        return None;
    }
    Some(EncryptedValue {
        key_id: (!key_id.is_empty()).then(|| key_id.to_string()),
        payload: payload.to_string(),
    })
}

/// Walk a record and replace every encrypted scalar with the store's plaintext.
///
/// Returns how many scalars were resolved. A store failure is a system error
/// naming the field, since a half-decrypted record must never reach validation.
pub fn resolve_secrets(record: &mut Value, store: &dyn SecretStore) -> Result<usize> {
    let mut resolved = 0;
    resolve_node(record, String::new(), store, &mut resolved)?;
    Ok(resolved)
}

fn resolve_node(
    node: &mut Value,
    path: String,
    store: &dyn SecretStore,
    resolved: &mut usize,
) -> Result<()> {
    match node {
        Value::String(s) => {
            if let Some(encrypted) = parse_encrypted(s) {
                let plaintext = store.decrypt(&encrypted).map_err(|message| {
                    ConfigError::Secret {
                        path: path.clone(),
                        message,
                    }
                })?;
                *node = Value::String(plaintext);
                *resolved += 1;
            }
        }
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                resolve_node(value, child, store, resolved)?;
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter_mut().enumerate() {
                resolve_node(value, format!("{path}[{index}]"), store, resolved)?;
            }
        }
        _ => {}
    }
    Ok(())
}
