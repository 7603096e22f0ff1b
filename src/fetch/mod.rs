// src/fetch/mod.rs
//
// Source adapter: everything that talks to the portal. Each submodule is one
// discovery strategy (or the shared HTTP plumbing); all of them hand tagged
// raw payloads back to the cascade and keep their failures local.

pub mod client;
pub mod embedded;
pub mod endpoints;
pub mod tables;

use serde_json::Value;

/// A payload worth keeping: non-null and non-empty. Endpoints that answer
/// with `null`, `{}`, `[]` or `""` are treated as having no data.
pub(crate) fn is_usable(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
