//! Report cards, multi-term student reports and class summaries built from
//! the grade register and the roster.

use crate::grading::aggregate::{AggregateResult, RawScores};
use crate::grading::classification::{Classification, classify};
use crate::grading::decimal::Grade;
use crate::grading::types::{GradeKey, Term};
use crate::roster::Roster;
use crate::store::GradeBook;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// One subject's line on a report card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectLine {
    pub subject_id: u32,
    pub subject_name: Option<String>,
    pub raw: RawScores,
    pub result: AggregateResult,
    pub classification: Classification,
}

impl SubjectLine {
    /// Subject name from the roster, falling back to the id.
    pub fn label(&self) -> String {
        self.subject_name
            .clone()
            .unwrap_or_else(|| self.subject_id.to_string())
    }
}

/// A student's results for every requested subject in one term.
///
/// The general averages are means over graded subjects only, those with a
/// non-zero final average.
#[derive(Debug, Clone, Serialize)]
pub struct ReportCard {
    pub student_id: u32,
    pub student_name: Option<String>,
    pub term: Term,
    pub generated_at: DateTime<Utc>,
    pub subjects: Vec<SubjectLine>,
    pub graded_subjects: usize,
    pub general_formative_average: Grade,
    pub general_summative_average: Grade,
    pub general_average: Grade,
    pub classification: Classification,
}

/// Every term a student has register rows for, in term order.
#[derive(Debug, Clone, Serialize)]
pub struct StudentReport {
    pub student_id: u32,
    pub student_name: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub terms: Vec<ReportCard>,
}

/// Counts of standings for one subject and term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSummary {
    pub subject_id: u32,
    pub subject_name: Option<String>,
    pub term: Term,
    pub total_students: usize,
    /// Students with at least one entered score.
    pub students_with_data: usize,
    pub passed: usize,
    pub conditional: usize,
    pub failed: usize,
    pub no_data: usize,
}

impl ClassSummary {
    pub fn count(&self, classification: Classification) -> usize {
        match classification {
            Classification::Passed => self.passed,
            Classification::Conditional => self.conditional,
            Classification::Failed => self.failed,
            Classification::NoData => self.no_data,
        }
    }
}

/// Builds a report card for `student_id` covering `subject_ids`, in order.
///
/// Subjects without a record show an all-zero result classified NO_DATA. The
/// general averages are quantized round-half-up.
pub fn report_card(
    book: &GradeBook,
    roster: &Roster,
    student_id: u32,
    term: Term,
    subject_ids: &[u32],
) -> ReportCard {
    let subjects: Vec<SubjectLine> = subject_ids
        .iter()
        .map(|&subject_id| {
            let (raw, result) = book
                .get(&GradeKey::new(student_id, subject_id, term))
                .map(|r| (r.raw, r.result))
                .unwrap_or_default();
            SubjectLine {
                subject_id,
                subject_name: roster.subject_name(subject_id),
                raw,
                result,
                classification: result.classification(),
            }
        })
        .collect();

    let graded: Vec<&AggregateResult> = subjects
        .iter()
        .map(|line| &line.result)
        .filter(|r| !r.final_average.is_zero())
        .collect();
    let general = |pick: fn(&AggregateResult) -> Grade| {
        let grades: Vec<Grade> = graded.iter().map(|&r| pick(r)).collect();
        Grade::mean_of(&grades)
    };
    let general_formative_average = general(|r| r.formative_average);
    let general_summative_average = general(|r| r.summative_average);
    let general_average = general(|r| r.final_average);

    debug!(
        student_id,
        term = term.number(),
        subjects = subjects.len(),
        graded = graded.len(),
        %general_average,
        "Report card built"
    );

    ReportCard {
        student_id,
        student_name: roster.student_name(student_id),
        term,
        generated_at: Utc::now(),
        graded_subjects: graded.len(),
        general_formative_average,
        general_summative_average,
        general_average,
        classification: classify(general_average),
        subjects,
    }
}

/// Builds one report card per term that has register rows for `student_id`,
/// each covering the subjects recorded in that term.
pub fn student_report(book: &GradeBook, roster: &Roster, student_id: u32) -> StudentReport {
    let terms: Vec<ReportCard> = Term::ALL
        .into_iter()
        .filter_map(|term| {
            let subject_ids: Vec<u32> = book
                .records_for_student(student_id, term)
                .map(|r| r.key.subject_id)
                .collect();
            (!subject_ids.is_empty())
                .then(|| report_card(book, roster, student_id, term, &subject_ids))
        })
        .collect();

    debug!(student_id, terms = terms.len(), "Student report built");

    StudentReport {
        student_id,
        student_name: roster.student_name(student_id),
        generated_at: Utc::now(),
        terms,
    }
}

/// Counts standings for `subject_id` over `student_ids`. Students without a
/// record count as NO_DATA.
pub fn class_summary(
    book: &GradeBook,
    roster: &Roster,
    subject_id: u32,
    term: Term,
    student_ids: &[u32],
) -> ClassSummary {
    let mut summary = ClassSummary {
        subject_id,
        subject_name: roster.subject_name(subject_id),
        term,
        total_students: student_ids.len(),
        students_with_data: 0,
        passed: 0,
        conditional: 0,
        failed: 0,
        no_data: 0,
    };

    for &student_id in student_ids {
        let record = book.get(&GradeKey::new(student_id, subject_id, term));

        if record.is_some_and(|r| r.raw.has_any()) {
            summary.students_with_data += 1;
        }

        let classification = record
            .map(|r| r.result.classification())
            .unwrap_or(Classification::NoData);
        match classification {
            Classification::Passed => summary.passed += 1,
            Classification::Conditional => summary.conditional += 1,
            Classification::Failed => summary.failed += 1,
            Classification::NoData => summary.no_data += 1,
        }
    }

    summary
}
