//! Judge-backed grading of answer or query content.

use crate::judge::Judge;
use crate::tags::{extract, TagKind};

use super::JudgeVerdict;

/// Grade the completion's content against the gold answer via the judge.
///
/// The gold answer decides which tag kind is graded: whichever tag it
/// carries first (answer wins over query) is the one extracted from the
/// completion. The judge is only consulted when both sides carry the same
/// kind; a mismatch scores 0.0 without a network call. This function is
/// total: every failure path collapses into a zero-score verdict.
pub async fn content_reward(
    judge: &dyn Judge,
    completion: &str,
    question: &str,
    gold_answer: &str,
) -> JudgeVerdict {
    let gold = match extract(gold_answer, None) {
        None => return JudgeVerdict::fail("malformed gold answer", ""),
        Some(e) => e,
    };

    let predicted = extract(completion, Some(gold.kind));

    let (category, result) = match (gold.kind, predicted) {
        (TagKind::Answer, Some(p)) => (
            "answer",
            judge.grade_answer(question, &gold.content, &p.content).await,
        ),
        (TagKind::Query, Some(p)) => (
            "query",
            judge.grade_query(question, &gold.content, &p.content).await,
        ),
        _ => return JudgeVerdict::fail("format mismatch", ""),
    };

    let raw = match result {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("judge call failed: {}", e);
            return JudgeVerdict::fail(format!("judge error: {}", e), "");
        }
    };

    match raw.trim().parse::<f64>() {
        Ok(value) if value == 0.0 || value == 1.0 => JudgeVerdict {
            score: value,
            category: category.to_string(),
            raw_output: raw,
        },
        Ok(value) => JudgeVerdict::fail(format!("invalid judge verdict: {}", value), raw),
        Err(_) => JudgeVerdict::fail("unparseable judge output", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::JudgeError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Judge that replies with a fixed string and counts invocations.
    struct FixedJudge {
        reply: Result<String, JudgeError>,
        calls: AtomicU32,
    }

    impl FixedJudge {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicU32::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(JudgeError::network("connection refused")),
                calls: AtomicU32::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Judge for FixedJudge {
        async fn grade_answer(&self, _q: &str, _g: &str, _p: &str) -> Result<String, JudgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }

        async fn grade_query(&self, _q: &str, _g: &str, _p: &str) -> Result<String, JudgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn test_answer_graded_one() {
        let judge = FixedJudge::replying("1");
        let verdict = content_reward(&judge, "<answer>42</answer>", "Q", "<answer>42</answer>").await;
        assert_eq!(verdict.score, 1.0);
        assert_eq!(verdict.category, "answer");
        assert_eq!(verdict.raw_output, "1");
    }

    #[tokio::test]
    async fn test_query_graded_zero() {
        let judge = FixedJudge::replying("0");
        let verdict = content_reward(&judge, "<query>next</query>", "Q", "<query>gold</query>").await;
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.category, "query");
    }

    #[tokio::test]
    async fn test_tag_kind_mismatch_skips_the_judge() {
        let judge = FixedJudge::replying("1");
        let verdict = content_reward(&judge, "<query>next</query>", "Q", "<answer>42</answer>").await;
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.category, "format mismatch");
        assert_eq!(judge.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_gold_skips_the_judge() {
        let judge = FixedJudge::replying("1");
        let verdict = content_reward(&judge, "<answer>42</answer>", "Q", "no tags at all").await;
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.category, "malformed gold answer");
        assert_eq!(judge.call_count(), 0);
    }

    #[tokio::test]
    async fn test_gold_with_label_and_answer_grades_the_answer() {
        // Gold text carries both a label and an answer; the answer tag wins
        // the probe and decides the category.
        let judge = FixedJudge::replying("1");
        let gold = "<label>able</label><answer>42</answer>";
        let verdict = content_reward(&judge, "<answer>42</answer>", "Q", gold).await;
        assert_eq!(verdict.score, 1.0);
        assert_eq!(verdict.category, "answer");
    }

    #[tokio::test]
    async fn test_out_of_range_verdict_is_rejected() {
        let judge = FixedJudge::replying("0.5");
        let verdict = content_reward(&judge, "<answer>42</answer>", "Q", "<answer>42</answer>").await;
        assert_eq!(verdict.score, 0.0);
        assert!(verdict.category.contains("invalid judge verdict"));
        assert_eq!(verdict.raw_output, "0.5");
    }

    #[tokio::test]
    async fn test_unparseable_verdict_keeps_raw_output() {
        let judge = FixedJudge::replying("yes");
        let verdict = content_reward(&judge, "<answer>42</answer>", "Q", "<answer>42</answer>").await;
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.category, "unparseable judge output");
        assert_eq!(verdict.raw_output, "yes");
    }

    #[tokio::test]
    async fn test_judge_failure_is_contained() {
        let judge = FixedJudge::failing();
        let verdict = content_reward(&judge, "<answer>42</answer>", "Q", "<answer>42</answer>").await;
        assert_eq!(verdict.score, 0.0);
        assert!(verdict.category.contains("judge error"));
    }
}
