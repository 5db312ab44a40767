//! Host-framework adapter.
//!
//! The training framework hands over rollout tasks and the responses the
//! policy generated for them; this adapter turns each pair into a scorer
//! call and writes the scalar reward back onto the response. It is wired
//! with its scorer by the composition root rather than registering itself
//! anywhere.

use serde_json::Value;

use crate::dataset::extract_user_question;
use crate::reward::RewardScorer;

/// One task as the host presents it: the rendered prompt and the reference
/// truth, which may be a structured mapping or a bare gold-answer string.
#[derive(Debug, Clone)]
pub struct RolloutTask {
    pub task_desc: String,
    pub truth: Value,
}

/// One generated response for a task, with its reward slots.
#[derive(Debug, Clone)]
pub struct RolloutResponse {
    pub text: String,
    pub reward: Option<f64>,
    pub metrics: std::collections::HashMap<String, f64>,
}

impl RolloutResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reward: None,
            metrics: std::collections::HashMap::new(),
        }
    }
}

/// Scores rollout responses and attaches the results.
pub struct WorkflowAdapter {
    scorer: RewardScorer,
}

impl WorkflowAdapter {
    pub fn new(scorer: RewardScorer) -> Self {
        Self { scorer }
    }

    /// Build the ground-truth value the scorer expects from a task.
    ///
    /// A mapping truth already carries `question`/`gold_answer` and passes
    /// through unchanged. A string truth is just the gold answer; the
    /// question is recovered from the prompt when its markers are present.
    fn ground_truth_for(&self, task: &RolloutTask) -> Value {
        match &task.truth {
            Value::Object(_) => task.truth.clone(),
            Value::String(gold) => {
                let question = match extract_user_question(&task.task_desc) {
                    Ok(q) => q,
                    Err(e) => {
                        tracing::warn!("could not recover question from prompt: {:#}", e);
                        String::new()
                    }
                };
                serde_json::json!({"question": question, "gold_answer": gold})
            }
            other => {
                tracing::warn!("unexpected truth shape: {}", other);
                other.clone()
            }
        }
    }

    /// Score every response for a task and attach the rewards.
    pub async fn apply(&self, task: &RolloutTask, responses: &mut [RolloutResponse]) {
        let ground_truth = self.ground_truth_for(task);
        for response in responses.iter_mut() {
            let total = self
                .scorer
                .score("rollout", &response.text, &ground_truth, None)
                .await;
            response.reward = Some(total);
            response.metrics.insert("total_reward".to_string(), total);
        }
    }
}
