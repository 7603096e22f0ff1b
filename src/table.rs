// src/table.rs
//
// Unifies flat rows produced across payloads into one rectangular table:
// union of all column names, deterministic ordering, empty fill.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::rows::{FlatRow, SUBJECT_COLUMN};

/// A rectangular table ready for CSV serialization. Every row has exactly one
/// cell per column; absent cells are `Null` and render empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Compute the union column set over `rows` and align every row to it.
///
/// Column order is `subject_id` first, then the remaining names
/// lexicographically, so repeated runs over the same rows (in any order)
/// produce byte-identical output.
pub fn unify(name: &str, rows: &[FlatRow]) -> Table {
    if rows.is_empty() {
        return Table {
            name: name.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
        };
    }

    let mut keys: BTreeSet<&str> = BTreeSet::new();
    for row in rows {
        keys.extend(row.keys().map(String::as_str));
    }

    let mut columns = Vec::with_capacity(keys.len());
    if keys.remove(SUBJECT_COLUMN) {
        columns.push(SUBJECT_COLUMN.to_string());
    }
    columns.extend(keys.into_iter().map(str::to_string));

    let grid = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| row.get(col).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Table {
        name: name.to_string(),
        columns,
        rows: grid,
    }
}

/// Render one cell for CSV output: null (and therefore absent) cells are
/// empty strings, strings are verbatim, numbers and booleans keep their JSON
/// rendering.
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
