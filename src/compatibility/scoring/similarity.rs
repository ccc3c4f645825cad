use super::super::domain::QuestionKind;

/// Largest answer distance on a 1..=5 scale. Wider gaps are clamped to it.
const MAX_SCALE_DISTANCE: u32 = 4;

/// Agreement between two answers to the same question, in `0.0..=1.0`.
///
/// Scale answers decay linearly with their distance (1 vs 5 scores zero); binary choices
/// either match or they don't.
pub fn similarity(a: i32, b: i32, kind: QuestionKind) -> f64 {
    match kind {
        QuestionKind::BinaryChoice => {
            if a == b {
                1.0
            } else {
                0.0
            }
        }
        QuestionKind::Scale5 => {
            let distance = a.abs_diff(b).min(MAX_SCALE_DISTANCE);
            1.0 - f64::from(distance) / f64::from(MAX_SCALE_DISTANCE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identical_scale_answers_are_fully_similar() {
        for answer in 1..=5 {
            assert_eq!(similarity(answer, answer, QuestionKind::Scale5), 1.0);
        }
    }

    #[test]
    fn opposite_scale_answers_score_zero() {
        assert_eq!(similarity(1, 5, QuestionKind::Scale5), 0.0);
        assert_eq!(similarity(5, 1, QuestionKind::Scale5), 0.0);
    }

    #[test]
    fn scale_similarity_decays_linearly() {
        assert_eq!(similarity(3, 4, QuestionKind::Scale5), 0.75);
        assert_eq!(similarity(2, 4, QuestionKind::Scale5), 0.5);
        assert_eq!(similarity(1, 4, QuestionKind::Scale5), 0.25);
    }

    #[test]
    fn out_of_domain_scale_answers_are_clamped() {
        assert_eq!(similarity(1, 9, QuestionKind::Scale5), 0.0);
        assert_eq!(similarity(-20, 5, QuestionKind::Scale5), 0.0);
        assert_eq!(similarity(i32::MIN, i32::MAX, QuestionKind::Scale5), 0.0);
    }

    #[test]
    fn binary_choice_has_no_partial_credit() {
        assert_eq!(similarity(1, 1, QuestionKind::BinaryChoice), 1.0);
        assert_eq!(similarity(2, 2, QuestionKind::BinaryChoice), 1.0);
        assert_eq!(similarity(1, 2, QuestionKind::BinaryChoice), 0.0);
        assert_eq!(similarity(2, 1, QuestionKind::BinaryChoice), 0.0);
    }

    proptest! {
        #[test]
        fn scale_similarity_is_symmetric(a in 1i32..=5, b in 1i32..=5) {
            prop_assert_eq!(
                similarity(a, b, QuestionKind::Scale5),
                similarity(b, a, QuestionKind::Scale5)
            );
        }

        #[test]
        fn similarity_stays_in_unit_interval(a in any::<i32>(), b in any::<i32>()) {
            for kind in [QuestionKind::Scale5, QuestionKind::BinaryChoice] {
                let value = similarity(a, b, kind);
                prop_assert!((0.0..=1.0).contains(&value));
            }
        }

        #[test]
        fn binary_choice_matches_only_on_equality(a in 1i32..=2, b in 1i32..=2) {
            let expected = if a == b { 1.0 } else { 0.0 };
            prop_assert_eq!(similarity(a, b, QuestionKind::BinaryChoice), expected);
        }
    }
}
