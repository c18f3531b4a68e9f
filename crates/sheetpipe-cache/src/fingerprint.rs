//! Content fingerprints for duplicate detection.
//!
//! The key is derived from row content only, never from identity fields, so
//! identical content from different rows or uploads collides by design.
//! Object keys are sorted before hashing; two rows whose headers arrived in
//! a different order still fingerprint identically.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Deterministic fingerprint of a JSON value: canonical (key-sorted)
/// serialization hashed with SHA-256, hex encoded.
pub fn content_fingerprint(value: &Value) -> String {
    let digest = Sha256::digest(canonicalize(value).to_string().as_bytes());
    hex::encode(digest)
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
