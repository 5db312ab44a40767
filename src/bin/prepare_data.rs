//! Prepare `{prompt, response}` training data for CHORD-style runs.
//!
//! Loads every `.json`/`.jsonl` file under the input directory, normalizes
//! the records, splits them into expert/RL/test portions and writes one
//! JSONL file per split.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use walkdir::WalkDir;

use rollout_reward::dataset::{
    self, normalize_record, split_for_training, write_jsonl, Record, SplitRatios,
};

#[derive(Parser)]
#[command(name = "prepare-data")]
#[command(about = "Prepare prompt/response data splits for CHORD training", long_about = None)]
struct Cli {
    /// Directory holding the source .json / .jsonl files
    #[arg(long, default_value = "sft_data")]
    input_dir: PathBuf,

    /// Directory to write the split files into
    #[arg(long, default_value = "chord_data")]
    output_dir: PathBuf,

    /// Share of the train portion reserved as expert (SFT) data
    #[arg(long, default_value_t = 0.25)]
    expert_ratio: f64,

    /// Share of the whole corpus used for training
    #[arg(long, default_value_t = 0.8)]
    train_ratio: f64,

    /// Shuffle seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn load_source_files(input_dir: &PathBuf) -> anyhow::Result<Vec<serde_json::Value>> {
    let mut raw = Vec::new();
    for entry in WalkDir::new(input_dir).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let values = match path.extension().and_then(|e| e.to_str()) {
            Some("jsonl") => dataset::read_jsonl(path),
            Some("json") => dataset::read_json(path),
            _ => continue,
        };
        match values {
            Ok(values) => {
                info!("loaded {} records from {}", values.len(), path.display());
                raw.extend(values);
            }
            Err(e) => warn!("skipping {}: {:#}", path.display(), e),
        }
    }
    Ok(raw)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    anyhow::ensure!(
        cli.input_dir.is_dir(),
        "input directory {} does not exist",
        cli.input_dir.display()
    );

    let raw = load_source_files(&cli.input_dir)?;
    anyhow::ensure!(!raw.is_empty(), "no data files found under {}", cli.input_dir.display());
    info!("loaded {} raw records", raw.len());

    let records: Vec<Record> = raw.iter().filter_map(normalize_record).collect();
    info!("{} records survived normalization", records.len());
    anyhow::ensure!(!records.is_empty(), "no usable prompt/response pairs");

    let splits = split_for_training(
        records,
        SplitRatios {
            expert_ratio: cli.expert_ratio,
            train_ratio: cli.train_ratio,
        },
        cli.seed,
    );

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("failed to create {}", cli.output_dir.display()))?;

    for (name, data) in [
        ("expert_data", &splits.expert),
        ("rl_data", &splits.rl),
        ("test_data", &splits.test),
        ("all_train_data", &splits.all_train),
    ] {
        if data.is_empty() {
            continue;
        }
        let path = cli.output_dir.join(format!("{}.jsonl", name));
        write_jsonl(&path, data)?;
        info!("wrote {} records to {}", data.len(), path.display());
    }

    info!(
        "done: expert={} rl={} test={}",
        splits.expert.len(),
        splits.rl.len(),
        splits.test.len()
    );
    Ok(())
}
