// src/rows.rs
//
// Turns one discovered payload into flat rows, attaching the subject id and
// provenance columns every exported row carries.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::flatten::{flatten, ROOT_KEY};
use crate::subject::Subject;

pub const SUBJECT_COLUMN: &str = "subject_id";
pub const SOURCE_COLUMN: &str = "source";

/// One flat row: column name → scalar value.
pub type FlatRow = BTreeMap<String, Value>;

/// Build the rows for one payload.
///
/// A null or empty-array payload yields no rows ("nothing to record"); every
/// other payload yields at least one. An array whose elements are all scalars
/// collapses to a single joined-string row, matching how the flattener treats
/// nested scalar lists; an array containing records yields one row per
/// element.
pub fn build_rows(payload: &Value, subject: &Subject, source_tag: &str) -> Vec<FlatRow> {
    match payload {
        Value::Null => Vec::new(),
        Value::Array(items) if items.is_empty() => Vec::new(),
        Value::Array(items) if items.iter().all(is_scalar) => {
            vec![finish(flatten(payload, ""), subject, source_tag)]
        }
        Value::Array(items) => items
            .iter()
            .map(|item| element_row(item, subject, source_tag))
            .collect(),
        Value::Object(_) => vec![finish(flatten(payload, ""), subject, source_tag)],
        scalar => vec![scalar_row(scalar, subject, source_tag)],
    }
}

fn element_row(item: &Value, subject: &Subject, source_tag: &str) -> FlatRow {
    match item {
        Value::Object(_) => finish(flatten(item, ""), subject, source_tag),
        // an element that is itself an array flattens under `value` so the
        // scalar-only invariant holds
        Value::Array(_) => finish(flatten(item, ROOT_KEY), subject, source_tag),
        scalar => scalar_row(scalar, subject, source_tag),
    }
}

fn scalar_row(value: &Value, subject: &Subject, source_tag: &str) -> FlatRow {
    finish(
        BTreeMap::from([(ROOT_KEY.to_string(), value.clone())]),
        subject,
        source_tag,
    )
}

fn finish(mut row: FlatRow, subject: &Subject, source_tag: &str) -> FlatRow {
    row.insert(SUBJECT_COLUMN.to_string(), Value::String(subject.id.clone()));
    row.insert(SOURCE_COLUMN.to_string(), Value::String(source_tag.to_string()));
    row
}

fn is_scalar(value: &Value) -> bool {
    !value.is_object() && !value.is_array()
}
