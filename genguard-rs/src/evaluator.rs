//! Fallback heuristic evaluation
//!
//! When the remote evaluator cannot produce a verdict, a candidate answer is
//! scored locally by an ordered list of rules. The first matching rule wins
//! and the last rule always matches.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Feedback for answers that are not a genuine attempt
pub const NOT_GENUINE_FEEDBACK: &str =
    "Your answer appears to be incomplete or not a genuine attempt. Please provide a complete answer.";

/// Feedback when an answer could not be checked
pub const UNVERIFIED_FEEDBACK: &str =
    "We could not fully evaluate your answer right now. Compare it with the reference answer to check your understanding.";

/// Score given to answers that could not be checked
pub const UNVERIFIED_SCORE: i64 = 30;

/// Answers shorter than this many characters are not a genuine attempt
const MIN_ANSWER_CHARS: usize = 5;

/// A run of this many identical characters marks keyboard mashing
const MASHING_RUN: usize = 5;

const NON_ANSWERS: &[&str] = &[
    "i don't know",
    "i dont know",
    "i do not know",
    "don't know",
    "dont know",
    "idk",
    "dunno",
    "no idea",
    "i have no idea",
    "not sure",
    "i'm not sure",
    "im not sure",
    "no clue",
    "pass",
    "skip",
    "n/a",
    "none",
    "nothing",
    "?",
];

/// Verdict on a candidate answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOutcome {
    is_acceptable: bool,
    feedback: String,
    score: u8,
}

impl EvaluationOutcome {
    /// Create an outcome, clamping `score` into `0..=100`
    pub fn new(is_acceptable: bool, feedback: impl Into<String>, score: i64) -> Self {
        Self {
            is_acceptable,
            feedback: feedback.into(),
            score: score.clamp(0, 100) as u8,
        }
    }

    pub fn is_acceptable(&self) -> bool {
        self.is_acceptable
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    pub fn score(&self) -> u8 {
        self.score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    NotGenuine,
    Unverified,
}

/// One heuristic rule
#[derive(Clone, Copy)]
pub struct FallbackRule {
    /// Stable rule name, reported in pipeline events
    pub name: &'static str,
    matches: fn(&str) -> bool,
    verdict: Verdict,
}

impl fmt::Debug for FallbackRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackRule")
            .field("name", &self.name)
            .field("verdict", &self.verdict)
            .finish()
    }
}

impl FallbackRule {
    fn outcome(&self) -> EvaluationOutcome {
        match self.verdict {
            Verdict::NotGenuine => EvaluationOutcome::new(false, NOT_GENUINE_FEEDBACK, 0),
            Verdict::Unverified => EvaluationOutcome::new(false, UNVERIFIED_FEEDBACK, UNVERIFIED_SCORE),
        }
    }
}

fn too_short(answer: &str) -> bool {
    answer.chars().count() < MIN_ANSWER_CHARS
}

fn non_answer(answer: &str) -> bool {
    let stripped = answer.trim_end_matches(|c: char| matches!(c, '.' | '!' | '?'));
    NON_ANSWERS.contains(&stripped) || NON_ANSWERS.contains(&answer)
}

fn no_letters(answer: &str) -> bool {
    !answer.chars().any(char::is_alphabetic)
}

fn keyboard_mashing(answer: &str) -> bool {
    let mut run = 0;
    let mut previous = None;

    for ch in answer.chars() {
        if ch.is_whitespace() {
            run = 0;
            previous = None;
            continue;
        }

        run = if previous == Some(ch) { run + 1 } else { 1 };
        previous = Some(ch);

        if run >= MASHING_RUN {
            return true;
        }
    }

    false
}

fn anything(_: &str) -> bool {
    true
}

/// Rules in evaluation order
pub static FALLBACK_RULES: [FallbackRule; 5] = [
    FallbackRule { name: "too_short", matches: too_short, verdict: Verdict::NotGenuine },
    FallbackRule { name: "non_answer", matches: non_answer, verdict: Verdict::NotGenuine },
    FallbackRule { name: "no_letters", matches: no_letters, verdict: Verdict::NotGenuine },
    FallbackRule { name: "keyboard_mashing", matches: keyboard_mashing, verdict: Verdict::NotGenuine },
    FallbackRule { name: "unverified", matches: anything, verdict: Verdict::Unverified },
];

fn normalize(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Rule-based evaluator used when the remote evaluator is unavailable
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicEvaluator;

impl HeuristicEvaluator {
    /// First rule matching `answer`
    pub fn matching_rule(&self, answer: &str) -> &'static FallbackRule {
        let normalized = normalize(answer);

        FALLBACK_RULES
            .iter()
            .find(|rule| (rule.matches)(&normalized))
            .unwrap_or(&FALLBACK_RULES[FALLBACK_RULES.len() - 1])
    }

    /// Score `answer` without any remote call
    pub fn evaluate(&self, answer: &str) -> EvaluationOutcome {
        self.matching_rule(answer).outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(EvaluationOutcome::new(true, "great", 140).score(), 100);
        assert_eq!(EvaluationOutcome::new(false, "bad", -5).score(), 0);
        assert_eq!(EvaluationOutcome::new(true, "ok", 73).score(), 73);
    }

    #[test]
    fn test_mashing_ignores_whitespace_runs() {
        assert!(keyboard_mashing("ok aaaaa"));
        assert!(!keyboard_mashing("aaaa aaaa"));
        assert!(!keyboard_mashing("a     b"));
    }

    #[test]
    fn test_last_rule_always_matches() {
        let last = FALLBACK_RULES.last().unwrap();
        assert!((last.matches)(""));
        assert_eq!(last.name, "unverified");
    }
}
