//! Enrolled students and offered subjects.
//!
//! The roster is the population reports are built over: a class summary counts
//! every enrolled student, including those without a single register row, and
//! report lines carry student and subject names from here.

use crate::error::GradeResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: u32,
    pub name: String,
    /// School year the student is enrolled in, e.g. `8vo`.
    pub grade: String,
    pub section: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Default, Clone)]
pub struct Roster {
    students: BTreeMap<u32, Student>,
    subjects: BTreeMap<u32, Subject>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_student(&mut self, student: Student) {
        if let Some(previous) = self.students.insert(student.id, student) {
            warn!(id = previous.id, "Duplicate student, keeping the later one");
        }
    }

    pub fn add_subject(&mut self, subject: Subject) {
        if let Some(previous) = self.subjects.insert(subject.id, subject) {
            warn!(id = previous.id, "Duplicate subject, keeping the later one");
        }
    }

    pub fn student(&self, id: u32) -> Option<&Student> {
        self.students.get(&id)
    }

    pub fn subject(&self, id: u32) -> Option<&Subject> {
        self.subjects.get(&id)
    }

    pub fn has_students(&self) -> bool {
        !self.students.is_empty()
    }

    pub fn has_subjects(&self) -> bool {
        !self.subjects.is_empty()
    }

    pub fn student_name(&self, id: u32) -> Option<String> {
        self.student(id).map(|s| s.name.clone())
    }

    pub fn subject_name(&self, id: u32) -> Option<String> {
        self.subject(id).map(|s| s.name.clone())
    }

    pub fn subject_ids(&self) -> Vec<u32> {
        self.subjects.keys().copied().collect()
    }

    /// Ids of enrolled students, optionally narrowed to one grade and section.
    pub fn student_ids(&self, grade: Option<&str>, section: Option<&str>) -> Vec<u32> {
        self.students
            .values()
            .filter(|s| grade.is_none_or(|g| s.grade == g))
            .filter(|s| section.is_none_or(|p| s.section == p))
            .map(|s| s.id)
            .collect()
    }

    /// Loads students (`id,name,grade,section`) and subjects (`id,name`).
    /// A missing file contributes nothing.
    pub fn load_csv(
        students_path: impl AsRef<Path>,
        subjects_path: impl AsRef<Path>,
    ) -> GradeResult<Self> {
        let mut roster = Self::new();
        for student in read_rows::<Student>(students_path.as_ref())? {
            roster.add_student(student);
        }
        for subject in read_rows::<Subject>(subjects_path.as_ref())? {
            roster.add_subject(subject);
        }

        info!(
            students = roster.students.len(),
            subjects = roster.subjects.len(),
            "Roster loaded"
        );
        Ok(roster)
    }
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> GradeResult<Vec<T>> {
    if !path.exists() {
        info!(path = %path.display(), "Roster file not found, skipping");
        return Ok(Vec::new());
    }

    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}
