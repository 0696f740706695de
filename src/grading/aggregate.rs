use crate::grading::classification::{Classification, classify};
use crate::grading::decimal::{Grade, Score};
use crate::grading::types::ScoreField;
use serde::{Deserialize, Serialize};

/// Weight of the formative average in the final average, in percent.
pub const FORMATIVE_WEIGHT: u32 = 70;
/// Weight of the summative average in the final average, in percent.
pub const SUMMATIVE_WEIGHT: u32 = 30;

/// The five sub-scores of one student, subject and term.
///
/// `None` means the score has not been entered yet. A stored `Some(0)` is
/// treated the same way, so registers that still use zero as the "not
/// entered" marker score identically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawScores {
    pub lesson1: Option<Score>,
    pub lesson2: Option<Score>,
    pub experiential: Option<Score>,
    pub project: Option<Score>,
    pub exam: Option<Score>,
}

impl RawScores {
    /// Builds scores from zero-as-absent values.
    pub fn from_legacy(
        lesson1: Score,
        lesson2: Score,
        experiential: Score,
        project: Score,
        exam: Score,
    ) -> Self {
        let present = |s: Score| (!s.is_zero()).then_some(s);
        RawScores {
            lesson1: present(lesson1),
            lesson2: present(lesson2),
            experiential: present(experiential),
            project: present(project),
            exam: present(exam),
        }
    }

    pub fn get(&self, field: ScoreField) -> Option<Score> {
        match field {
            ScoreField::Lesson1 => self.lesson1,
            ScoreField::Lesson2 => self.lesson2,
            ScoreField::Experiential => self.experiential,
            ScoreField::Project => self.project,
            ScoreField::Exam => self.exam,
        }
    }

    /// Returns a copy with one field replaced. A zero value clears the field.
    pub fn with(mut self, field: ScoreField, value: Option<Score>) -> Self {
        let value = value.filter(|s| !s.is_zero());
        match field {
            ScoreField::Lesson1 => self.lesson1 = value,
            ScoreField::Lesson2 => self.lesson2 = value,
            ScoreField::Experiential => self.experiential = value,
            ScoreField::Project => self.project = value,
            ScoreField::Exam => self.exam = value,
        }
        self
    }

    pub fn formative(&self) -> [Option<Score>; 3] {
        [self.lesson1, self.lesson2, self.experiential]
    }

    pub fn summative(&self) -> [Option<Score>; 2] {
        [self.project, self.exam]
    }

    /// True when at least one score has been entered.
    pub fn has_any(&self) -> bool {
        ScoreField::ALL
            .iter()
            .any(|&f| self.get(f).is_some_and(|s| !s.is_zero()))
    }
}

/// Averages and contributions derived from a [`RawScores`].
///
/// Every field is quantized to two decimals, and
/// `final_average == formative_contribution + summative_contribution`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub formative_average: Grade,
    pub formative_contribution: Grade,
    pub summative_average: Grade,
    pub summative_contribution: Grade,
    pub final_average: Grade,
}

impl AggregateResult {
    pub fn classification(&self) -> Classification {
        classify(self.final_average)
    }
}

/// Computes averages, contributions and the final average.
///
/// Rounds half-up to two decimals after every step: each group average, each
/// weighted contribution, then their sum. Absent and zero scores are left out
/// of their group; an empty group averages to `0.00`.
pub fn compute(raw: RawScores) -> AggregateResult {
    let formative_average = group_average(&raw.formative());
    let formative_contribution = formative_average.weighted(FORMATIVE_WEIGHT);

    let summative_average = group_average(&raw.summative());
    let summative_contribution = summative_average.weighted(SUMMATIVE_WEIGHT);

    let final_average = Grade::quantize((formative_contribution + summative_contribution).into());

    AggregateResult {
        formative_average,
        formative_contribution,
        summative_average,
        summative_contribution,
        final_average,
    }
}

fn group_average(group: &[Option<Score>]) -> Grade {
    let entered: Vec<Score> = group
        .iter()
        .flatten()
        .copied()
        .filter(|s| !s.is_zero())
        .collect();
    Grade::mean(&entered)
}
