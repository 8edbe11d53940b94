//! Quiz Models

use crate::uuids::TypedUuid;

/// Quiz UUID
pub type QuizUuid = TypedUuid<Quiz>;

/// A skill assessment. Questions come from an external provider; only the
/// pass threshold matters here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    pub uuid: QuizUuid,
    pub topic: String,
    pub department: String,
    pub total_questions: u32,

    /// Minimum percentage, `0..=100`, needed to pass.
    pub passing_percentage: u8,
    pub active: bool,
}

/// Result of grading one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOutcome {
    /// Floored percentage of correct answers.
    pub percentage: u8,
    pub passed: bool,
}

impl Quiz {
    /// Grade an attempt with `correct` right answers.
    ///
    /// Answers beyond the question count are ignored. A quiz without
    /// questions cannot be passed.
    #[must_use]
    pub fn evaluate(&self, correct: u32) -> QuizOutcome {
        if self.total_questions == 0 {
            return QuizOutcome {
                percentage: 0,
                passed: false,
            };
        }

        let correct = u64::from(correct.min(self.total_questions));
        let percentage = correct * 100 / u64::from(self.total_questions);
        let percentage = u8::try_from(percentage).unwrap_or(100);

        QuizOutcome {
            percentage,
            passed: percentage >= self.passing_percentage,
        }
    }

    /// Synthetic event name under which skill certificates are issued.
    #[must_use]
    pub fn certificate_event_name(&self) -> String {
        format!("{} Skill Assessment", self.topic)
    }
}
