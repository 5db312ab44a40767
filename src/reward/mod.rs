//! Reward aggregation for tag-structured completions.
//!
//! Three independent sub-scorers each award a hard 0 or 1: format
//! validation, label agreement, and judge-graded content. Their sum is the
//! scalar reward handed back to the training loop. The aggregation boundary
//! is infallible by signature: whatever goes wrong inside, the caller gets
//! a float.

mod content;
mod format;
mod label;

pub use content::content_reward;
pub use format::format_reward;
pub use label::label_reward;

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::audit::AuditLog;
use crate::judge::Judge;

/// Outcome of the format check.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatVerdict {
    pub score: f64,
    pub reason: String,
}

impl FormatVerdict {
    pub fn pass() -> Self {
        Self {
            score: 1.0,
            reason: "well-formed".to_string(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            reason: reason.into(),
        }
    }
}

/// Outcome of the label comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVerdict {
    pub score: f64,
    pub gold_label: String,
    pub reason: String,
}

impl LabelVerdict {
    pub fn fail(gold_label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            gold_label: gold_label.into(),
            reason: reason.into(),
        }
    }
}

/// Outcome of the judge-graded content check.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeVerdict {
    pub score: f64,
    /// What was graded (`answer` / `query`), or the failure reason.
    pub category: String,
    /// The judge's reply verbatim, kept for the audit trail.
    pub raw_output: String,
}

impl JudgeVerdict {
    pub fn fail(category: impl Into<String>, raw_output: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            category: category.into(),
            raw_output: raw_output.into(),
        }
    }
}

/// One scored completion, ready for the audit log.
#[derive(Debug, Clone)]
pub struct RewardRecord {
    pub total: f64,
    pub format: FormatVerdict,
    pub label: LabelVerdict,
    pub judge: JudgeVerdict,
    pub completion: String,
}

fn truncated(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

impl RewardRecord {
    pub fn new(
        format: FormatVerdict,
        label: LabelVerdict,
        judge: JudgeVerdict,
        completion: impl Into<String>,
    ) -> Self {
        Self {
            total: format.score + label.score + judge.score,
            format,
            label,
            judge,
            completion: completion.into(),
        }
    }

    /// Audit line without the completion text.
    pub fn summary_line(&self) -> String {
        let format_info = if self.format.score < 1.0 {
            format!("format({:.1}:{})", self.format.score, truncated(&self.format.reason, 20))
        } else {
            format!("format({:.1})", self.format.score)
        };
        let label_info = if self.label.score < 1.0 {
            format!(
                "label({:.1}:{}-{})",
                self.label.score,
                self.label.gold_label,
                truncated(&self.label.reason, 20)
            )
        } else {
            format!("label({:.1}:{})", self.label.score, self.label.gold_label)
        };
        let content_info = if self.judge.score < 1.0 {
            format!("content({:.1}:{})", self.judge.score, truncated(&self.judge.category, 30))
        } else {
            format!("content({:.1})", self.judge.score)
        };
        format!(
            "{:.1}/3.0 | {} {} {} | judge_output:{}",
            self.total,
            format_info,
            label_info,
            content_info,
            self.judge.raw_output.trim()
        )
    }

    /// Audit line including the newline-flattened completion text.
    pub fn full_line(&self) -> String {
        let flattened = self.completion.replace('\n', " ");
        format!("{} | completion:{}", self.summary_line(), flattened.trim())
    }
}

/// Structured form of the reference data for one task.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GroundTruth {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub gold_answer: String,
}

impl GroundTruth {
    /// Decode the ground truth the host hands over.
    ///
    /// Accepts a JSON mapping, a JSON-encoded string of one, or a bare
    /// string, which is taken to be the gold answer itself with no
    /// question attached.
    pub fn decode(value: &Value) -> Self {
        match value {
            Value::String(s) => match serde_json::from_str::<GroundTruth>(s) {
                Ok(gt) => gt,
                Err(_) => GroundTruth {
                    question: String::new(),
                    gold_answer: s.clone(),
                },
            },
            other => serde_json::from_value(other.clone()).unwrap_or_default(),
        }
    }
}

/// Aggregates the three sub-scores into the scalar reward.
///
/// Constructed and wired explicitly by the composition root; holds the
/// judge behind a trait object so tests can swap the network out.
pub struct RewardScorer {
    judge: Arc<dyn Judge>,
    audit: Option<AuditLog>,
}

impl RewardScorer {
    pub fn new(judge: Arc<dyn Judge>, audit: AuditLog) -> Self {
        Self {
            judge,
            audit: Some(audit),
        }
    }

    /// Scorer without audit files, for embedding and tests.
    pub fn without_audit(judge: Arc<dyn Judge>) -> Self {
        Self { judge, audit: None }
    }

    /// Score one completion. Always returns a value in `[0.0, 3.0]`.
    ///
    /// `data_source` and `extra_info` are informational and only surface in
    /// diagnostics; scoring depends solely on the completion and the ground
    /// truth.
    pub async fn score(
        &self,
        data_source: &str,
        solution_str: &str,
        ground_truth: &Value,
        extra_info: Option<&Value>,
    ) -> f64 {
        match self.try_score(data_source, solution_str, ground_truth, extra_info).await {
            Ok(total) => total,
            Err(e) => {
                tracing::error!("reward computation failed, returning 0.0: {:#}", e);
                0.0
            }
        }
    }

    async fn try_score(
        &self,
        data_source: &str,
        solution_str: &str,
        ground_truth: &Value,
        extra_info: Option<&Value>,
    ) -> anyhow::Result<f64> {
        let truth = GroundTruth::decode(ground_truth);
        if truth.gold_answer.is_empty() {
            tracing::warn!(data_source, "ground truth has no gold answer, scoring 0.0");
            return Ok(0.0);
        }
        if let Some(extra) = extra_info {
            tracing::debug!(data_source, %extra, "scoring with extra info");
        }

        // The three checks are independent by design: a bad format must not
        // hide a correct label or answer from the log.
        let format = format_reward(solution_str);
        let label = label_reward(solution_str, &truth.gold_answer);
        let judge = content_reward(
            self.judge.as_ref(),
            solution_str,
            &truth.question,
            &truth.gold_answer,
        )
        .await;

        let record = RewardRecord::new(format, label, judge, solution_str);
        if let Some(audit) = &self.audit {
            audit.write(&record)?;
        }
        tracing::info!(data_source, total = record.total, "{}", record.summary_line());

        Ok(record.total)
    }
}
