//! Data types shared by the register, the update parser and reporting.

use crate::error::GradeError;
use crate::grading::aggregate::{AggregateResult, RawScores, compute};
use crate::grading::decimal::Score;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three school trimesters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Term {
    First,
    Second,
    Third,
}

impl Term {
    pub const ALL: [Term; 3] = [Term::First, Term::Second, Term::Third];

    pub fn number(self) -> u8 {
        match self {
            Term::First => 1,
            Term::Second => 2,
            Term::Third => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Term::First => "First Term",
            Term::Second => "Second Term",
            Term::Third => "Third Term",
        }
    }
}

impl TryFrom<u8> for Term {
    type Error = GradeError;

    fn try_from(n: u8) -> Result<Self, GradeError> {
        match n {
            1 => Ok(Term::First),
            2 => Ok(Term::Second),
            3 => Ok(Term::Third),
            other => Err(GradeError::InvalidTerm(other)),
        }
    }
}

impl From<Term> for u8 {
    fn from(term: Term) -> u8 {
        term.number()
    }
}

impl FromStr for Term {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self, GradeError> {
        let n: u8 = s
            .trim()
            .parse()
            .map_err(|_| GradeError::InvalidTerm(0))?;
        Term::try_from(n)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Names one of the five editable sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreField {
    Lesson1,
    Lesson2,
    Experiential,
    Project,
    Exam,
}

impl ScoreField {
    pub const ALL: [ScoreField; 5] = [
        ScoreField::Lesson1,
        ScoreField::Lesson2,
        ScoreField::Experiential,
        ScoreField::Project,
        ScoreField::Exam,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScoreField::Lesson1 => "lesson1",
            ScoreField::Lesson2 => "lesson2",
            ScoreField::Experiential => "experiential",
            ScoreField::Project => "project",
            ScoreField::Exam => "exam",
        }
    }
}

impl FromStr for ScoreField {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self, GradeError> {
        ScoreField::ALL
            .into_iter()
            .find(|f| f.name() == s.trim())
            .ok_or_else(|| GradeError::UnknownField(s.to_string()))
    }
}

impl fmt::Display for ScoreField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies one record in the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GradeKey {
    pub student_id: u32,
    pub subject_id: u32,
    pub term: Term,
}

impl GradeKey {
    pub fn new(student_id: u32, subject_id: u32, term: Term) -> Self {
        Self {
            student_id,
            subject_id,
            term,
        }
    }
}

impl fmt::Display for GradeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "student {} / subject {} / term {}",
            self.student_id, self.subject_id, self.term
        )
    }
}

/// A stored grade: raw scores plus the result computed from them when written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeRecord {
    pub key: GradeKey,
    pub raw: RawScores,
    pub result: AggregateResult,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GradeRecord {
    /// Builds a record, computing its result from `raw`.
    pub fn new(key: GradeKey, raw: RawScores, now: DateTime<Utc>) -> Self {
        Self {
            key,
            raw,
            result: compute(raw),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the next version of this record with new raw scores and a fresh result.
    pub fn revised(&self, raw: RawScores, now: DateTime<Utc>) -> Self {
        Self {
            key: self.key,
            raw,
            result: compute(raw),
            notes: self.notes.clone(),
            created_at: self.created_at,
            updated_at: now,
        }
    }
}

/// A change to a single sub-score. `value` of `None` clears the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub student_id: u32,
    pub subject_id: u32,
    pub term: Term,
    pub field: ScoreField,
    pub value: Option<Score>,
}

impl ScoreUpdate {
    pub fn key(&self) -> GradeKey {
        GradeKey::new(self.student_id, self.subject_id, self.term)
    }
}
