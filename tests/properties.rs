//! Property tests for grade aggregation.

use gradebook::grading::{Classification, Grade, RawScores, Score, ScoreField, compute};
use proptest::prelude::*;

/// Scores in [0, 10] with two decimals; roughly one in four is not entered.
fn score() -> impl Strategy<Value = Option<Score>> {
    prop_oneof![
        1 => Just(None),
        3 => (0i64..=1000).prop_map(|h| Some(Score::from_hundredths(h))),
    ]
}

fn raw_scores() -> impl Strategy<Value = RawScores> {
    (score(), score(), score(), score(), score()).prop_map(
        |(lesson1, lesson2, experiential, project, exam)| RawScores {
            lesson1,
            lesson2,
            experiential,
            project,
            exam,
        },
    )
}

fn field() -> impl Strategy<Value = ScoreField> {
    prop::sample::select(ScoreField::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: compute is deterministic.
    #[test]
    fn property_compute_is_idempotent(raw in raw_scores()) {
        prop_assert_eq!(compute(raw), compute(raw));
    }

    /// PROPERTY: the final average is the sum of the rounded contributions.
    #[test]
    fn property_final_is_sum_of_contributions(raw in raw_scores()) {
        let r = compute(raw);
        prop_assert_eq!(r.final_average, r.formative_contribution + r.summative_contribution);
    }

    /// PROPERTY: in-range inputs stay on the 0-10 scale.
    #[test]
    fn property_final_within_scale(raw in raw_scores()) {
        let r = compute(raw);
        prop_assert!(r.final_average >= Grade::ZERO);
        prop_assert!(r.final_average <= Grade::from_hundredths(1000));
    }

    /// PROPERTY: raising one entered score never lowers the final average.
    #[test]
    fn property_monotonic_in_each_input(
        raw in raw_scores(),
        field in field(),
        base in 1i64..=1000,
        bump in 0i64..=1000,
    ) {
        let lower = raw.with(field, Some(Score::from_hundredths(base)));
        let higher = raw.with(field, Some(Score::from_hundredths(base + bump)));
        prop_assert!(compute(higher).final_average >= compute(lower).final_average);
    }

    /// PROPERTY: a lone formative score is its own average.
    #[test]
    fn property_single_formative_value_passes_through(
        field in prop::sample::select(vec![
            ScoreField::Lesson1,
            ScoreField::Lesson2,
            ScoreField::Experiential,
        ]),
        h in 1i64..=1000,
    ) {
        let raw = RawScores::default().with(field, Some(Score::from_hundredths(h)));
        prop_assert_eq!(compute(raw).formative_average, Grade::from_hundredths(h));
    }

    /// PROPERTY: zero and absent scores are interchangeable.
    #[test]
    fn property_zero_equals_absent(raw in raw_scores(), field in field()) {
        let cleared = raw.with(field, None);
        let mut zeroed = cleared;
        match field {
            ScoreField::Lesson1 => zeroed.lesson1 = Some(Score::ZERO),
            ScoreField::Lesson2 => zeroed.lesson2 = Some(Score::ZERO),
            ScoreField::Experiential => zeroed.experiential = Some(Score::ZERO),
            ScoreField::Project => zeroed.project = Some(Score::ZERO),
            ScoreField::Exam => zeroed.exam = Some(Score::ZERO),
        }
        prop_assert_eq!(compute(zeroed), compute(cleared));
    }

    /// PROPERTY: nothing entered always classifies as NO_DATA.
    #[test]
    fn property_nothing_entered_is_no_data(blanks in prop::collection::vec(any::<bool>(), 5)) {
        let blank = |zero: bool| zero.then_some(Score::ZERO);
        let raw = RawScores {
            lesson1: blank(blanks[0]),
            lesson2: blank(blanks[1]),
            experiential: blank(blanks[2]),
            project: blank(blanks[3]),
            exam: blank(blanks[4]),
        };
        let r = compute(raw);
        prop_assert_eq!(r.final_average, Grade::ZERO);
        prop_assert_eq!(r.classification(), Classification::NoData);
    }

    /// PROPERTY: entered scores of at least 0.02 never classify as NO_DATA.
    #[test]
    fn property_entered_scores_have_data(
        raw in raw_scores().prop_filter("two-hundredths or more", |r| {
            r.has_any()
                && ScoreField::ALL
                    .iter()
                    .filter_map(|&f| r.get(f))
                    .all(|s| s.is_zero() || s >= Score::from_hundredths(2))
        })
    ) {
        prop_assert_ne!(compute(raw).classification(), Classification::NoData);
    }
}
