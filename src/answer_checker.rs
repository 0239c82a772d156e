//! Local grading of multiple-choice answers.

/// Outcome of grading one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_correct: bool,
    /// Feedback phrased for speech synthesis.
    pub message: String,
}

/// Compare a submitted option label against the correct one.
///
/// Comparison is case-insensitive and ignores surrounding whitespace on
/// both sides. Pure and deterministic.
pub fn check(correct_label: &str, submitted_label: &str, explanation: &str) -> Verdict {
    let correct = correct_label.trim();
    let is_correct = submitted_label.trim().eq_ignore_ascii_case(correct);

    let message = if is_correct {
        format!("Correct! {explanation}")
    } else {
        format!("Incorrect. The correct answer is {correct}. {explanation}")
    };

    Verdict {
        is_correct,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let verdict = check("A", "A", "Because reasons.");
        assert!(verdict.is_correct);
        assert_eq!(verdict.message, "Correct! Because reasons.");
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert!(check("A", " a ", "").is_correct);
        assert!(check(" b", "B", "").is_correct);
        assert!(check("C", "\tc\n", "").is_correct);
    }

    #[test]
    fn test_wrong_answer() {
        let verdict = check("A", "B", "Chlorophyll absorbs light.");
        assert!(!verdict.is_correct);
        assert_eq!(
            verdict.message,
            "Incorrect. The correct answer is A. Chlorophyll absorbs light."
        );
    }

    #[test]
    fn test_deterministic() {
        let first = check("D", "d", "explanation");
        let second = check("D", "d", "explanation");
        assert_eq!(first, second);
    }
}
