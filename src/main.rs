use anyhow::Result;
use clap::Parser;
use metroscrape::{
    config::ExtractorConfig,
    discover::Strategy,
    export::OutputDirs,
    fetch,
    pipeline,
    rows::FlatRow,
    subject::Subject,
};
use std::{collections::BTreeMap, path::PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Extract city economic-profile data from the Metroverse portal into CSV
/// tables.
#[derive(Parser, Debug)]
#[command(name = "metroscrape", version, about)]
struct Args {
    /// City id to process (repeatable)
    #[arg(long = "city-id")]
    city_ids: Vec<String>,

    /// Human-readable name for a single --city-id
    #[arg(long = "city-name")]
    city_name: Option<String>,

    /// Process the built-in sample cities instead
    #[arg(long)]
    sample: bool,

    /// Output directory
    #[arg(long, default_value = "metroverse_data")]
    output_dir: PathBuf,

    /// YAML config file overriding the built-in portal settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let default_filter = if args.verbose { "debug" } else { "info" };
    let env =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let cfg = match &args.config {
        Some(path) => ExtractorConfig::load(path)?,
        None => ExtractorConfig::default(),
    };

    // ─── 3) pick subjects ────────────────────────────────────────────
    let subjects: Vec<Subject> = if !args.city_ids.is_empty() {
        let mut list: Vec<Subject> = args
            .city_ids
            .iter()
            .map(|id| Subject::new(id.as_str()))
            .collect();
        if list.len() == 1 {
            list[0].label = args.city_name.clone();
        }
        list
    } else if args.sample {
        cfg.sample_subjects.clone()
    } else {
        vec![Subject::with_label("3444", "Bucharest")]
    };
    info!(subjects = subjects.len(), "selected subjects");

    // ─── 4) output dirs + shared client ──────────────────────────────
    let dirs = OutputDirs::create(&args.output_dir)?;
    let client = fetch::client::build_client(&cfg)?;
    let strategies = Strategy::DEFAULT_ORDER;

    // ─── 5) process subjects sequentially ────────────────────────────
    let mut combined: BTreeMap<String, Vec<FlatRow>> = BTreeMap::new();
    let mut processed = 0usize;

    for subject in &subjects {
        // existence is a hard gate, checked before the cascade starts
        match fetch::endpoints::subject_exists(&client, &cfg, subject).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(subject = %subject.id, "subject does not exist; skipping");
                continue;
            }
            Err(err) => {
                error!(subject = %subject.id, error = %err, "existence check failed; skipping");
                continue;
            }
        }

        match pipeline::process_subject(&client, &cfg, &dirs, subject, &strategies).await {
            Ok(report) => {
                processed += 1;
                for (name, rows) in report.rows_by_table {
                    combined.entry(name).or_default().extend(rows);
                }
            }
            Err(err) => {
                // one subject's failure must not stop the batch
                error!(subject = %subject.id, error = %err, "subject failed");
            }
        }
    }

    // ─── 6) combined tables across subjects ──────────────────────────
    if cfg.combine_subjects && subjects.len() > 1 && !combined.is_empty() {
        let written = pipeline::write_combined(&dirs, &combined)?;
        info!(tables = written, "wrote combined tables");
    }

    info!(processed, total = subjects.len(), "all done");
    Ok(())
}
