// src/pipeline.rs
//
// Per-subject orchestration: discovery, row building per logical table,
// unification, export. One subject's pipeline is independent of every other
// subject; the caller decides what to do with the returned rows (combined
// tables, reporting).

use std::collections::BTreeMap;

use anyhow::Result;
use reqwest::Client;
use tracing::{info, warn};

use crate::config::ExtractorConfig;
use crate::discover::{self, Strategy};
use crate::export::{self, OutputDirs};
use crate::rows::{build_rows, FlatRow};
use crate::subject::{sanitize_name, Subject};
use crate::table::unify;

/// What one subject's pipeline run produced.
pub struct SubjectReport {
    pub subject: Subject,
    pub exhausted: bool,
    pub tables_written: usize,
    /// Rows grouped by logical table name, for cross-subject combination.
    pub rows_by_table: BTreeMap<String, Vec<FlatRow>>,
}

/// Run the full pipeline for one subject: cascade, flatten, unify, export.
///
/// A subject for which discovery is exhausted yields a report with no tables
/// and a logged warning, not an error.
#[tracing::instrument(level = "info", skip_all, fields(subject = %subject.id))]
pub async fn process_subject(
    client: &Client,
    cfg: &ExtractorConfig,
    dirs: &OutputDirs,
    subject: &Subject,
    strategies: &[Strategy],
) -> Result<SubjectReport> {
    info!(name = %subject.display_name(), "processing subject");
    let discovery = discover::discover(client, cfg, subject, strategies).await;

    if discovery.is_exhausted() {
        warn!("no data discovered; nothing to export");
        return Ok(SubjectReport {
            subject: subject.clone(),
            exhausted: true,
            tables_written: 0,
            rows_by_table: BTreeMap::new(),
        });
    }

    if cfg.include_raw_json {
        export::save_raw_payloads(dirs, subject, &discovery)?;
    }

    // group rows by logical table name; payloads sharing a tag share a table
    let mut rows_by_table: BTreeMap<String, Vec<FlatRow>> = BTreeMap::new();
    for payload in discovery.iter_payloads() {
        let tag = payload.table_tag();
        let rows = build_rows(&payload.value, subject, &tag);
        if rows.is_empty() {
            continue;
        }
        rows_by_table.entry(tag).or_default().extend(rows);
    }

    let mut tables_written = 0;
    for (name, rows) in &rows_by_table {
        let table = unify(name, rows);
        if table.is_empty() {
            continue;
        }
        let path = dirs
            .processed_csv
            .join(format!("{}_{}.csv", sanitize_name(&subject.id), name));
        export::write_table_csv(&table, &path)?;
        tables_written += 1;
    }

    info!(
        strategies = discovery.successful_strategies(),
        payloads = discovery.payload_count(),
        tables = tables_written,
        "subject complete"
    );

    Ok(SubjectReport {
        subject: subject.clone(),
        exhausted: false,
        tables_written,
        rows_by_table,
    })
}

/// Re-unify rows collected across subjects into one combined table per
/// logical name. The only cross-subject coupling in the pipeline.
pub fn write_combined(
    dirs: &OutputDirs,
    all_rows: &BTreeMap<String, Vec<FlatRow>>,
) -> Result<usize> {
    let mut written = 0;
    for (name, rows) in all_rows {
        let table = unify(name, rows);
        if table.is_empty() {
            continue;
        }
        let path = dirs.processed_csv.join(format!("combined_{name}.csv"));
        export::write_table_csv(&table, &path)?;
        written += 1;
    }
    Ok(written)
}
