//! LLM-as-judge abstraction for grading completion content.
//!
//! The judge receives a question, the gold content, and the predicted
//! content, and replies with a single token that must render as `0` or `1`.
//! [`client::OpenAiJudge`] is the HTTP implementation; tests substitute
//! their own [`Judge`] to avoid the network.

pub mod client;
mod error;

pub use client::OpenAiJudge;
pub use error::{classify_http_status, JudgeError, JudgeErrorKind, RetryConfig};

use async_trait::async_trait;
use std::path::Path;

/// External judge used to grade answer or query content against gold.
///
/// Both methods return the judge's raw reply text; parsing the 0/1 verdict
/// out of it belongs to the caller, which also owns the decision of what an
/// unparseable reply is worth.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Grade a predicted answer against the gold answer.
    async fn grade_answer(
        &self,
        question: &str,
        gold_answer: &str,
        predicted_answer: &str,
    ) -> Result<String, JudgeError>;

    /// Grade a predicted follow-up query against the gold query.
    async fn grade_query(
        &self,
        question: &str,
        gold_query: &str,
        predicted_query: &str,
    ) -> Result<String, JudgeError>;
}

/// The two grading prompt templates, loaded once at construction.
///
/// Templates are plain text files with `{question}`, `{gold_answer}` /
/// `{gold_query}` and `{predicted_answer}` / `{predicted_query}`
/// substitution points.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    answer: String,
    query: String,
}

impl PromptTemplates {
    /// Load `eval_answer.txt` and `eval_query.txt` from a prompt directory.
    pub fn load(dir: &Path) -> Result<Self, JudgeError> {
        let read = |name: &str| {
            std::fs::read_to_string(dir.join(name))
                .map(|s| s.trim().to_string())
                .map_err(|e| {
                    JudgeError::template(format!("cannot read {}: {}", dir.join(name).display(), e))
                })
        };
        Ok(Self {
            answer: read("eval_answer.txt")?,
            query: read("eval_query.txt")?,
        })
    }

    /// Build from in-memory template strings.
    pub fn from_strings(answer: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            query: query.into(),
        }
    }

    pub fn render_answer(&self, question: &str, gold: &str, predicted: &str) -> String {
        self.answer
            .replace("{question}", question)
            .replace("{gold_answer}", gold)
            .replace("{predicted_answer}", predicted)
    }

    pub fn render_query(&self, question: &str, gold: &str, predicted: &str) -> String {
        self.query
            .replace("{question}", question)
            .replace("{gold_query}", gold)
            .replace("{predicted_query}", predicted)
    }
}

/// Strip code-fence noise off a judge reply, leaving the bare verdict token.
///
/// Constrained decoding still occasionally wraps the digit in backticks or a
/// `json` fence marker.
pub fn clean_verdict(raw: &str) -> String {
    raw.trim()
        .trim_matches('`')
        .trim_start_matches("json")
        .trim()
        .to_string()
}
