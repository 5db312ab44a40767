//! Training dataset plumbing.
//!
//! Everything here moves `{prompt, response}` records around: normalizing
//! heterogeneous source files into that shape, splitting them into
//! expert/RL/test portions for CHORD-style training, JSONL IO, and the
//! validation pass that checks each prompt still yields its original user
//! question.

use anyhow::Context;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// One prompt/response training pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub prompt: String,
    pub response: String,
}

/// Field names probed, in order, when a source record does not use
/// `prompt`/`response` directly.
const PROMPT_KEYS: [&str; 6] = ["prompt", "question", "input", "text", "query", "problem"];
const RESPONSE_KEYS: [&str; 6] = ["response", "answer", "output", "target", "solution", "completion"];

fn string_field(item: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = item.get(*key) {
            let text = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Null => continue,
                other => other.to_string(),
            };
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Normalize one source record into a [`Record`].
///
/// A `messages` conversation takes precedence over flat fields, pairing the
/// first user turn with the first assistant turn. Records missing either
/// side are dropped.
pub fn normalize_record(item: &Value) -> Option<Record> {
    let mut prompt = string_field(item, &PROMPT_KEYS);
    let mut response = string_field(item, &RESPONSE_KEYS);

    if let Some(Value::Array(messages)) = item.get("messages") {
        let mut user = None;
        let mut assistant = None;
        for message in messages {
            let role = message.get("role").and_then(Value::as_str);
            let content = message.get("content").and_then(Value::as_str);
            match (role, content) {
                (Some("user"), Some(c)) if user.is_none() => user = Some(c.trim().to_string()),
                (Some("assistant"), Some(c)) if assistant.is_none() => {
                    assistant = Some(c.trim().to_string())
                }
                _ => {}
            }
        }
        if let (Some(u), Some(a)) = (user, assistant) {
            prompt = Some(u);
            response = Some(a);
        }
    }

    match (prompt, response) {
        (Some(prompt), Some(response)) if !prompt.is_empty() && !response.is_empty() => {
            Some(Record { prompt, response })
        }
        _ => None,
    }
}

/// How to cut the corpus for CHORD training.
#[derive(Debug, Clone, Copy)]
pub struct SplitRatios {
    /// Share of the train portion reserved as expert (SFT) data.
    pub expert_ratio: f64,
    /// Share of the whole corpus used for training.
    pub train_ratio: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            expert_ratio: 0.25,
            train_ratio: 0.8,
        }
    }
}

/// The split corpus. `all_train` is `expert` and `rl` together, in shuffle
/// order.
#[derive(Debug, Clone)]
pub struct DataSplits {
    pub expert: Vec<Record>,
    pub rl: Vec<Record>,
    pub test: Vec<Record>,
    pub all_train: Vec<Record>,
}

/// Shuffle and split records for training. Deterministic for a fixed seed.
/// Ratios outside `[0, 1]` take everything or nothing rather than failing.
pub fn split_for_training(mut records: Vec<Record>, ratios: SplitRatios, seed: u64) -> DataSplits {
    let train_ratio = ratios.train_ratio.clamp(0.0, 1.0);
    let expert_ratio = ratios.expert_ratio.clamp(0.0, 1.0);

    let mut rng = StdRng::seed_from_u64(seed);
    records.shuffle(&mut rng);

    let train_size = (records.len() as f64 * train_ratio) as usize;
    let test = records.split_off(train_size);
    let all_train = records;

    let expert_size = (all_train.len() as f64 * expert_ratio) as usize;
    let expert = all_train[..expert_size].to_vec();
    let rl = all_train[expert_size..].to_vec();

    DataSplits {
        expert,
        rl,
        test,
        all_train,
    }
}

/// Read raw JSON values from a `.jsonl` file, skipping blank lines.
pub fn read_jsonl(path: &Path) -> anyhow::Result<Vec<Value>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut values = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid JSON", path.display(), index + 1))?;
        values.push(value);
    }
    Ok(values)
}

/// Read a `.json` file holding either one record or an array of them.
pub fn read_json(path: &Path) -> anyhow::Result<Vec<Value>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("{}: invalid JSON", path.display()))?;
    Ok(match value {
        Value::Array(items) => items,
        single => vec![single],
    })
}

/// Write records as JSONL, one compact object per line.
pub fn write_jsonl(path: &Path, records: &[Record]) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for record in records {
        let line = serde_json::to_string(record).context("failed to serialize record")?;
        writeln!(file, "{}", line)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

const QUESTION_START: &str = "User query:";
const QUESTION_END: &str = "Graph evidence:";

/// Recover the original user question from a rendered prompt.
///
/// Prompts embed the question between `User query:` and `Graph evidence:`
/// markers; scoring needs it back out to hand to the judge.
pub fn extract_user_question(prompt: &str) -> anyhow::Result<String> {
    let start = prompt
        .find(QUESTION_START)
        .with_context(|| format!("'{}' marker not found in prompt", QUESTION_START))?
        + QUESTION_START.len();
    let end = prompt[start..]
        .find(QUESTION_END)
        .with_context(|| format!("'{}' marker not found in prompt", QUESTION_END))?
        + start;
    let question = prompt[start..end].trim();
    anyhow::ensure!(!question.is_empty(), "extracted question is empty");
    Ok(question.to_string())
}

/// One failed record in a validation run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub line: usize,
    pub message: String,
    /// Leading slice of the offending line or prompt.
    pub preview: String,
}

/// Result of validating one dataset file.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub path: String,
    pub total: usize,
    pub passed: usize,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

fn preview_of(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Validate that every record in a JSONL dataset file parses, carries a
/// `prompt`, and yields a plausibly sized original question.
pub fn validate_file(path: &Path) -> anyhow::Result<ValidationReport> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut report = ValidationReport {
        path: path.display().to_string(),
        total: 0,
        passed: 0,
        errors: Vec::new(),
    };

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line_number = index + 1;
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        report.total += 1;

        let value: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                report.errors.push(ValidationError {
                    line: line_number,
                    message: format!("invalid JSON: {}", e),
                    preview: preview_of(trimmed, 100),
                });
                continue;
            }
        };

        let prompt = match value.get("prompt").and_then(Value::as_str) {
            Some(p) => p,
            None => {
                report.errors.push(ValidationError {
                    line: line_number,
                    message: "missing 'prompt' field".to_string(),
                    preview: preview_of(trimmed, 100),
                });
                continue;
            }
        };

        let question = match extract_user_question(prompt) {
            Ok(q) => q,
            Err(e) => {
                report.errors.push(ValidationError {
                    line: line_number,
                    message: e.to_string(),
                    preview: preview_of(prompt, 200),
                });
                continue;
            }
        };

        let len = question.chars().count();
        if len < 5 {
            report.errors.push(ValidationError {
                line: line_number,
                message: "extracted question is too short".to_string(),
                preview: question,
            });
            continue;
        }
        if len > 500 {
            report.errors.push(ValidationError {
                line: line_number,
                message: format!("extracted question is too long ({} chars)", len),
                preview: preview_of(&question, 100),
            });
            continue;
        }

        report.passed += 1;
    }

    Ok(report)
}
