//! Grade aggregation, classification and reporting.
//!
//! Five raw sub-scores become a formative and a summative average, their
//! 70% / 30% contributions and a final average on a 0–10 scale. Every stage
//! is quantized to two decimals with round-half-up, and scores that have not
//! been entered are left out of their group.

pub mod aggregate;
pub mod classification;
pub mod decimal;
pub mod report;
pub mod types;

pub use aggregate::{AggregateResult, RawScores, compute};
pub use classification::{Classification, classify};
pub use decimal::{Grade, Score};
pub use types::{GradeKey, GradeRecord, ScoreField, ScoreUpdate, Term};
