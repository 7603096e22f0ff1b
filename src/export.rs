// src/export.rs
//
// Persistence collaborator: rectangular tables go out as CSV, and each
// subject's raw payloads are kept as a JSON audit artifact.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::discover::DiscoveryResult;
use crate::subject::{sanitize_name, Subject};
use crate::table::{render_cell, Table};

/// Output directory layout, created once at startup.
pub struct OutputDirs {
    pub raw_json: PathBuf,
    pub processed_csv: PathBuf,
}

impl OutputDirs {
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let dirs = OutputDirs {
            raw_json: root.join("raw_json"),
            processed_csv: root.join("processed_csv"),
        };
        for dir in [&dirs.raw_json, &dirs.processed_csv] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating output directory {}", dir.display()))?;
        }
        Ok(dirs)
    }
}

/// Write one table as CSV: header row, then every row rendered cell by cell.
pub fn write_table_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer
        .write_record(&table.columns)
        .context("writing CSV header")?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(render_cell))
            .context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    info!(path = %path.display(), rows = table.rows.len(), "wrote table");
    Ok(())
}

/// Save every payload discovery found for `subject`, with provenance and a
/// fetch timestamp, as a pretty-printed JSON audit artifact.
pub fn save_raw_payloads(
    dirs: &OutputDirs,
    subject: &Subject,
    discovery: &DiscoveryResult,
) -> Result<PathBuf> {
    let mut strategies = serde_json::Map::new();
    for (name, payloads) in &discovery.payloads {
        let entries: Vec<Value> = payloads
            .iter()
            .map(|p| json!({"origin": p.origin, "data": p.value}))
            .collect();
        strategies.insert((*name).to_string(), Value::Array(entries));
    }

    let artifact = json!({
        "subject_id": subject.id,
        "subject_label": subject.label,
        "fetched_at": Utc::now().to_rfc3339(),
        "strategies": strategies,
    });

    let path = dirs
        .raw_json
        .join(format!("{}_payloads.json", sanitize_name(&subject.id)));
    let text = serde_json::to_string_pretty(&artifact).context("serializing audit artifact")?;
    fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "saved raw payloads");
    Ok(path)
}
