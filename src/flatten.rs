// src/flatten.rs
//
// Recursive collapse of one arbitrary nested JSON value into a single-level
// mapping of path keys to scalars. Pure and synchronous; the row builder
// decides when a top-level array becomes multiple rows instead.

use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_SEPARATOR: char = '_';

/// Key used when a scalar has no path prefix to attach to.
pub const ROOT_KEY: &str = "value";

/// Flatten `value` under `key_prefix` with the default `_` separator.
///
/// Rules:
/// - scalars map to a single entry under the prefix (or `value` with no prefix);
/// - object fields recurse under `prefix_field`;
/// - an array whose elements are all objects is summarized as `prefix_count`
///   plus the first element flattened under `prefix_first`; nested record
///   lists do not multiply rows;
/// - any other array joins its elements with `", "` into one string, an empty
///   array yielding an empty string.
///
/// Two differently nested fields can collapse to the same key (`{"a":{"b":1}}`
/// vs `{"a_b":2}`); the later entry in key order silently wins. Known
/// limitation, kept for parity with the data this was built against.
pub fn flatten(value: &Value, key_prefix: &str) -> BTreeMap<String, Value> {
    flatten_with_separator(value, key_prefix, DEFAULT_SEPARATOR)
}

pub fn flatten_with_separator(
    value: &Value,
    key_prefix: &str,
    sep: char,
) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    flatten_into(value, key_prefix, sep, &mut out);
    out
}

fn flatten_into(value: &Value, prefix: &str, sep: char, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}{sep}{key}")
                };
                flatten_into(child, &child_prefix, sep, out);
            }
        }
        Value::Array(items) => {
            if !items.is_empty() && items.iter().all(Value::is_object) {
                out.insert(format!("{prefix}{sep}count"), Value::from(items.len()));
                flatten_into(&items[0], &format!("{prefix}{sep}first"), sep, out);
            } else {
                out.insert(leaf_key(prefix), Value::String(join_scalars(items)));
            }
        }
        scalar => {
            out.insert(leaf_key(prefix), scalar.clone());
        }
    }
}

fn leaf_key(prefix: &str) -> String {
    if prefix.is_empty() {
        ROOT_KEY.to_string()
    } else {
        prefix.to_string()
    }
}

/// Join array elements into one display string: strings verbatim, everything
/// else in its JSON rendering (`1.5`, `true`, `null`).
fn join_scalars(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
