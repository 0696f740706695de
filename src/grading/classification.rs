use crate::grading::decimal::Grade;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest final average that passes.
pub const PASSING: Grade = Grade::from_hundredths(700);
/// Lowest final average that qualifies for the supplementary exam.
pub const CONDITIONAL: Grade = Grade::from_hundredths(500);

/// Standing derived from a final average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Passed,
    /// Supplementary exam required.
    Conditional,
    Failed,
    /// No score has been entered.
    NoData,
}

/// Converts a final average into a [`Classification`].
///
/// | Range              | Classification |
/// |--------------------|----------------|
/// | >= 7.00            | PASSED         |
/// | >= 5.00            | CONDITIONAL    |
/// | == 0.00            | NO_DATA        |
/// | otherwise          | FAILED         |
pub fn classify(final_average: Grade) -> Classification {
    match final_average {
        g if g >= PASSING => Classification::Passed,
        g if g >= CONDITIONAL => Classification::Conditional,
        g if g.is_zero() => Classification::NoData,
        _ => Classification::Failed,
    }
}

impl Classification {
    pub const ALL: [Classification; 4] = [
        Classification::Passed,
        Classification::Conditional,
        Classification::Failed,
        Classification::NoData,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Classification::Passed => "PASSED",
            Classification::Conditional => "CONDITIONAL",
            Classification::Failed => "FAILED",
            Classification::NoData => "NO_DATA",
        }
    }

    /// Text colour used for this standing in rendered reports.
    pub fn color(self) -> &'static str {
        match self {
            Classification::Passed => "#2e7d32",
            Classification::Conditional => "#f57c00",
            Classification::Failed => "#c62828",
            Classification::NoData => "#6c757d",
        }
    }

    /// Badge style name for HTML tables.
    pub fn badge(self) -> &'static str {
        match self {
            Classification::Passed => "success",
            Classification::Conditional => "warning",
            Classification::Failed => "danger",
            Classification::NoData => "secondary",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
