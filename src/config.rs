//! Runtime settings read from the environment (and `.env`, loaded by the binary).

use crate::error::GradeError;

pub const DEFAULT_DATA_FILE: &str = "data/grades.csv";
pub const DEFAULT_LOG_FILE: &str = "logs/gradebook.log";
pub const DEFAULT_STUDENTS_FILE: &str = "data/students.csv";
pub const DEFAULT_SUBJECTS_FILE: &str = "data/subjects.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// CSV file holding the grade register (`GRADEBOOK_DATA`).
    pub data_file: String,
    /// Rolling JSON log file (`LOG_FILE_PATH`).
    pub log_file_path: String,
    /// Subjects listed on report cards when none are given (`GRADEBOOK_SUBJECTS`).
    pub default_subjects: Vec<u32>,
    /// Enrolled students, `id,name,grade,section` (`GRADEBOOK_STUDENTS_FILE`).
    pub students_file: String,
    /// Subject names, `id,name` (`GRADEBOOK_SUBJECTS_FILE`).
    pub subjects_file: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, GradeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GradeError> {
        let default_subjects = match lookup("GRADEBOOK_SUBJECTS") {
            Some(list) => parse_id_list(&list)?,
            None => Vec::new(),
        };

        Ok(Self {
            data_file: lookup("GRADEBOOK_DATA").unwrap_or_else(|| DEFAULT_DATA_FILE.to_string()),
            log_file_path: lookup("LOG_FILE_PATH").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
            default_subjects,
            students_file: lookup("GRADEBOOK_STUDENTS_FILE")
                .unwrap_or_else(|| DEFAULT_STUDENTS_FILE.to_string()),
            subjects_file: lookup("GRADEBOOK_SUBJECTS_FILE")
                .unwrap_or_else(|| DEFAULT_SUBJECTS_FILE.to_string()),
        })
    }
}

/// Parses a comma-separated list of numeric ids, ignoring blanks.
pub fn parse_id_list(list: &str) -> Result<Vec<u32>, GradeError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| GradeError::InvalidId {
                id: s.to_string(),
                list: list.to_string(),
            })
        })
        .collect()
}
