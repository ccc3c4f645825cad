use std::collections::BTreeMap;

use tracing::debug;

use super::super::domain::{AnswerSet, CompatibilityResult, QuestionDefinition, DEFAULT_WEIGHT};
use super::similarity::similarity;

pub(crate) fn score_answers(
    questions: &[QuestionDefinition],
    answers_a: &AnswerSet,
    answers_b: &AnswerSet,
) -> CompatibilityResult {
    let mut weighted_sum = 0.0_f64;
    let mut weight_sum = 0.0_f64;
    let mut topics: BTreeMap<&str, Vec<f64>> = BTreeMap::new();

    for question in questions {
        let (Some(a), Some(b)) = (answers_a.get(&question.id), answers_b.get(&question.id)) else {
            debug!(question = %question.id, "skipping question not answered by both members");
            continue;
        };

        let weight = effective_weight(question.weight);
        let value = similarity(a, b, question.kind);

        weighted_sum += weight * value;
        weight_sum += weight;
        topics.entry(question.topic.as_str()).or_default().push(value);
    }

    let score = percent(weighted_sum / weight_sum.max(1.0));

    let breakdown = topics
        .into_iter()
        .map(|(topic, values)| {
            let total: f64 = values.iter().sum();
            (topic.to_string(), percent(total / values.len() as f64))
        })
        .collect();

    CompatibilityResult { score, breakdown }
}

/// Weights outside the positive finite range fall back to the default so scoring stays total.
///
/// This includes an explicit `0`, which counts as `1` here rather than removing the
/// question from the score. Catalogs loaded from disk reject such weights up front.
fn effective_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        DEFAULT_WEIGHT
    }
}

/// Scales a `0..=1` ratio to a whole percentage, rounding half away from zero.
fn percent(ratio: f64) -> u8 {
    (100.0 * ratio).round().clamp(0.0, 100.0) as u8
}
