//! Pairwise answer comparison producing an overall score and a per-topic breakdown.
//!
//! Scoring never fails: questions missing an answer from either member are skipped and
//! out-of-range scale answers are clamped, so one bad data point cannot sink a result.

mod aggregate;
mod similarity;

pub use similarity::similarity;

use super::domain::{AnswerSet, CompatibilityResult, QuestionDefinition, QuestionnaireDefinition};

/// Scores two answer sets against an ordered list of questions.
pub fn score(
    questions: &[QuestionDefinition],
    answers_a: &AnswerSet,
    answers_b: &AnswerSet,
) -> CompatibilityResult {
    aggregate::score_answers(questions, answers_a, answers_b)
}

/// Stateless scorer bound to a whole questionnaire definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatibilityScorer;

impl CompatibilityScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        questionnaire: &QuestionnaireDefinition,
        answers_a: &AnswerSet,
        answers_b: &AnswerSet,
    ) -> CompatibilityResult {
        score(&questionnaire.questions, answers_a, answers_b)
    }
}
