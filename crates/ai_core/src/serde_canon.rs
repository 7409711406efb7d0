//! Canonical JSON serialization and artifact hashing
//!
//! Scaler blobs are written as canonical JSON (sorted keys, no whitespace)
//! so that identical artifacts always hash identically.

use crate::errors::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Serialize a value to canonical JSON (sorted keys, no whitespace)
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let json_value = serde_json::to_value(value)?;
    let canonical = canonicalize_value(&json_value);
    Ok(serde_json::to_string(&canonical)?)
}

/// Canonicalize a JSON value by sorting all object keys recursively
fn canonicalize_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut btree = BTreeMap::new();
            for (k, v) in map {
                btree.insert(k.clone(), canonicalize_value(v));
            }
            serde_json::Value::Object(btree.into_iter().collect())
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(canonicalize_value).collect())
        }
        other => other.clone(),
    }
}

/// BLAKE3 over a sequence of byte strings, hex encoded.
///
/// Each part is length-prefixed so that moving bytes between parts changes
/// the digest.
pub fn hash_parts_hex(parts: &[&[u8]]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hex::encode(hasher.finalize().as_bytes())
}

/// BLAKE3 of the canonical JSON form, hex encoded.
pub fn hash_canonical_hex<T: Serialize>(value: &T) -> Result<String> {
    let json = to_canonical_json(value)?;
    Ok(hash_parts_hex(&[json.as_bytes()]))
}
