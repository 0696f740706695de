//! Error type for parsing scores and reading or writing the grade register.

use thiserror::Error;

/// Result alias for gradebook operations.
pub type GradeResult<T> = Result<T, GradeError>;

#[derive(Error, Debug)]
pub enum GradeError {
    /// Text that is not an exact decimal score
    #[error("invalid score '{input}': {reason}")]
    InvalidScore { input: String, reason: &'static str },

    #[error("unknown score field '{0}'")]
    UnknownField(String),

    /// Terms are numbered 1 to 3
    #[error("invalid term {0}, expected 1, 2 or 3")]
    InvalidTerm(u8),

    #[error("invalid id '{id}' in list '{list}'")]
    InvalidId { id: String, list: String },

    #[error("malformed update on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
