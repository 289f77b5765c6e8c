//! Content-addressed identity for queries
//!
//! Every identifier is `sha256(canonical_json(value))` rendered as lowercase hex.
//! Canonical JSON sorts object keys and has no insignificant whitespace, so
//! identical inputs hash identically on every platform.
//!
//! Three hashes share this scheme:
//! - [`query_id`]: `{intent, params, location}`, the identity of a query site
//! - [`content_hash`]: `{intent, params, returnType}`, change detection
//! - [`cache_key`]: `{id, intent (trimmed), params}`, cache file names

use crate::query::{Params, QueryLocation};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

/// Serialize a JSON value with sorted keys and no whitespace
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn digest(value: &Value) -> String {
    let canonical = canonical_json(value);
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

fn params_json(params: Option<&Params>) -> Value {
    match params {
        Some(params) => Value::Object(
            params
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect::<Map<String, Value>>(),
        ),
        None => Value::Null,
    }
}

fn location_json(location: Option<&QueryLocation>) -> Value {
    match location {
        Some(loc) => json!({
            "file": loc.file,
            "line": loc.line,
            "column": loc.column,
        }),
        None => Value::Null,
    }
}

/// Identity of a query site
///
/// Absent params or location hash as JSON `null`.
pub fn query_id(intent: &str, params: Option<&Params>, location: Option<&QueryLocation>) -> String {
    digest(&json!({
        "intent": intent,
        "params": params_json(params),
        "location": location_json(location),
    }))
}

/// Identity computable at runtime from the intent pattern alone
///
/// Distinct call sites sharing intent text collide under this variant.
pub fn runtime_query_id(intent: &str) -> String {
    query_id(intent, None, None)
}

/// Hash of the parts of a query that influence generated SQL
pub fn content_hash(intent: &str, params: Option<&Params>, return_type: Option<&str>) -> String {
    digest(&json!({
        "intent": intent,
        "params": params_json(params),
        "returnType": return_type,
    }))
}

/// Cache key for a query; missing params hash as an empty object
pub fn cache_key(id: &str, intent: &str, params: Option<&Params>) -> String {
    let params = match params {
        Some(_) => params_json(params),
        None => Value::Object(Map::new()),
    };

    digest(&json!({
        "id": id,
        "intent": intent.trim(),
        "params": params,
    }))
}
