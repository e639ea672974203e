//! Tests for the fallback heuristic evaluator

#[cfg(test)]
mod tests {
    use crate::evaluator::{HeuristicEvaluator, NOT_GENUINE_FEEDBACK, UNVERIFIED_FEEDBACK};

    #[test]
    fn test_idk_scores_zero() {
        let outcome = HeuristicEvaluator.evaluate("idk");

        assert_eq!(outcome.score(), 0);
        assert!(!outcome.is_acceptable());
        assert_eq!(outcome.feedback(), NOT_GENUINE_FEEDBACK);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let evaluator = HeuristicEvaluator;

        assert_eq!(evaluator.matching_rule("idk").name, "too_short");
        assert_eq!(evaluator.matching_rule("  I don't know.  ").name, "non_answer");
        assert_eq!(evaluator.matching_rule("No Idea").name, "non_answer");
        assert_eq!(evaluator.matching_rule("12345 678").name, "no_letters");
        assert_eq!(evaluator.matching_rule("asdfffffff").name, "keyboard_mashing");
        assert_eq!(
            evaluator.matching_rule("Photosynthesis turns light into chemical energy").name,
            "unverified"
        );
    }

    #[test]
    fn test_genuine_answer_gets_unverified_score() {
        let outcome = HeuristicEvaluator.evaluate("The mitochondria produce most of the cell's energy");

        assert_eq!(outcome.score(), 30);
        assert!(!outcome.is_acceptable());
        assert_eq!(outcome.feedback(), UNVERIFIED_FEEDBACK);
    }

    #[test]
    fn test_same_input_same_outcome() {
        let evaluator = HeuristicEvaluator;
        for answer in ["", "pass", "zzzzzzzz", "A reasonable attempt at an answer"] {
            assert_eq!(evaluator.evaluate(answer), evaluator.evaluate(answer));
        }
    }

    #[test]
    fn test_fallback_never_accepts() {
        let evaluator = HeuristicEvaluator;
        for answer in ["", "?", "!!!!!!!!", "n/a", "Water boils at 100 degrees Celsius at sea level"] {
            let outcome = evaluator.evaluate(answer);
            assert!(!outcome.is_acceptable());
            assert!(outcome.score() == 0 || outcome.score() == 30);
        }
    }
}
