//! # rollout-reward
//!
//! Reward scoring for RL fine-tuning of tag-structured completions.
//!
//! A completion is expected to look like
//!
//! ```text
//! <think>…</think><label>able|unable</label><answer>…</answer>
//! ```
//!
//! (or a `<query>` span when the label is `unable`). Scoring awards one
//! point each for a well-formed tag structure, a label that agrees with the
//! gold answer, and content an external LLM judge accepts, for a total in
//! `[0, 3]`. The scorer never raises into the training loop: every failure
//! mode degrades to a zero sub-score with a logged reason.
//!
//! ## Modules
//! - `tags`: tag extraction primitives
//! - `reward`: the three sub-scorers and the aggregating [`RewardScorer`]
//! - `judge`: LLM-as-judge trait, HTTP client, retry policy
//! - `audit`: paired append-only audit logs
//! - `config`: YAML settings for the judge endpoint
//! - `dataset`: `{prompt, response}` normalization, splitting, validation
//! - `workflow`: adapter wiring the scorer to host rollout types

pub mod audit;
pub mod config;
pub mod dataset;
pub mod judge;
pub mod reward;
pub mod tags;
pub mod workflow;

pub use audit::{AuditLog, DEFAULT_LOG_DIR};
pub use config::{ApiConfig, Config};
pub use judge::{Judge, JudgeError, OpenAiJudge, PromptTemplates, RetryConfig};
pub use reward::{GroundTruth, RewardRecord, RewardScorer};
pub use workflow::WorkflowAdapter;
