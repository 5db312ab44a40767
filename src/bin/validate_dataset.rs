//! Validate that dataset files are scoreable before a training run.
//!
//! Checks every record parses, carries a `prompt`, and yields its original
//! user question. Exits non-zero when any record fails so CI can gate on
//! it.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use rollout_reward::dataset::validate_file;

#[derive(Parser)]
#[command(name = "validate-dataset")]
#[command(about = "Validate prompt extraction over JSONL dataset files", long_about = None)]
struct Cli {
    /// Dataset files to validate
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Write a JSON error report to this path when records fail
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut total = 0usize;
    let mut passed = 0usize;
    let mut reports = Vec::new();

    for path in &cli.files {
        let report = validate_file(path)
            .with_context(|| format!("failed to validate {}", path.display()))?;
        let ratio = if report.total > 0 {
            report.passed as f64 / report.total as f64 * 100.0
        } else {
            100.0
        };
        info!(
            "{}: {}/{} records passed ({:.1}%)",
            report.path, report.passed, report.total, ratio
        );
        for err in report.errors.iter().take(5) {
            error!("  line {}: {}", err.line, err.message);
        }
        if report.errors.len() > 5 {
            error!("  ... and {} more", report.errors.len() - 5);
        }

        total += report.total;
        passed += report.passed;
        reports.push(report);
    }

    let failed = total - passed;
    info!("overall: {}/{} records passed, {} failed", passed, total, failed);

    if failed > 0 {
        if let Some(report_path) = &cli.report {
            let json = serde_json::to_string_pretty(&reports)?;
            std::fs::write(report_path, json)
                .with_context(|| format!("failed to write {}", report_path.display()))?;
            info!("error report written to {}", report_path.display());
        }
        std::process::exit(1);
    }

    info!("all records are scoreable");
    Ok(())
}
