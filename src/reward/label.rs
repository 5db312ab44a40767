//! Label agreement between a completion and its gold answer.

use crate::tags::{extract, TagKind};

use super::LabelVerdict;

/// Compare the completion's `<label>` against the gold answer's.
///
/// Malformed gold data is reported, not raised: this runs at scoring time
/// and a bad reference must not take the rollout down with it.
pub fn label_reward(completion: &str, gold_answer: &str) -> LabelVerdict {
    let gold = match extract(gold_answer, Some(TagKind::Label)) {
        None => {
            return LabelVerdict::fail("unknown", "gold answer has no <label> tag");
        }
        Some(e) => e.content,
    };

    let gold_clean = gold.trim().to_lowercase();
    if gold_clean != "able" && gold_clean != "unable" {
        return LabelVerdict::fail(
            gold_clean.clone(),
            format!("gold answer label is invalid: {}", gold),
        );
    }

    let predicted = match extract(completion, Some(TagKind::Label)) {
        None => {
            return LabelVerdict::fail(gold_clean, "completion has no <label> tag");
        }
        Some(e) => e.content,
    };

    let predicted_clean = predicted.trim().to_lowercase();
    if predicted_clean == gold_clean {
        LabelVerdict {
            score: 1.0,
            gold_label: gold_clean,
            reason: "match".to_string(),
        }
    } else {
        LabelVerdict::fail(
            gold_clean,
            format!("mismatch ({})", predicted_clean),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_labels() {
        let verdict = label_reward("<label>able</label>", "<label>able</label>");
        assert_eq!(verdict.score, 1.0);
        assert_eq!(verdict.gold_label, "able");
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let verdict = label_reward("<label>ABLE</label>", "<label>able</label>");
        assert_eq!(verdict.score, 1.0);
    }

    #[test]
    fn test_mismatch_names_the_completion_label() {
        let verdict = label_reward("<label>unable</label>", "<label>able</label>");
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.gold_label, "able");
        assert!(verdict.reason.contains("unable"));
    }

    #[test]
    fn test_completion_label_missing() {
        let verdict = label_reward("<answer>42</answer>", "<label>able</label>");
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.gold_label, "able");
        assert!(verdict.reason.contains("no <label>"));
    }

    #[test]
    fn test_gold_label_missing() {
        let verdict = label_reward("<label>able</label>", "<answer>42</answer>");
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.gold_label, "unknown");
    }

    #[test]
    fn test_gold_label_invalid() {
        let verdict = label_reward("<label>able</label>", "<label>yes</label>");
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.gold_label, "yes");
        assert!(verdict.reason.contains("invalid"));
    }
}
