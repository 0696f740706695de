//! Output formatting and export for grade results.
//!
//! Supports pretty-printing, JSON logging, CSV append and report export.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::grading::Score;
use crate::grading::report::{ReportCard, StudentReport};
use csv::{Writer, WriterBuilder};
use std::fmt::Debug;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl Debug) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends a record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, record: &impl Serialize) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// One row of an exported report card.
#[derive(Serialize)]
struct ReportRow {
    student_id: u32,
    term: u8,
    subject: String,
    lesson1: String,
    lesson2: String,
    experiential: String,
    project: String,
    exam: String,
    formative_average: String,
    formative_contribution: String,
    summative_average: String,
    summative_contribution: String,
    final_average: String,
    classification: &'static str,
}

/// Raw sub-score cell; a score that was never entered is written as `-`.
fn raw_cell(score: Option<Score>) -> String {
    score
        .filter(|s| !s.is_zero())
        .map_or_else(|| "-".to_string(), |s| s.to_string())
}

fn write_card_rows<W: Write>(writer: &mut Writer<W>, card: &ReportCard) -> Result<()> {
    let term = card.term.number();

    for line in &card.subjects {
        let raw = line.raw;
        let result = line.result;
        writer.serialize(ReportRow {
            student_id: card.student_id,
            term,
            subject: line.label(),
            lesson1: raw_cell(raw.lesson1),
            lesson2: raw_cell(raw.lesson2),
            experiential: raw_cell(raw.experiential),
            project: raw_cell(raw.project),
            exam: raw_cell(raw.exam),
            formative_average: result.formative_average.to_string(),
            formative_contribution: result.formative_contribution.to_string(),
            summative_average: result.summative_average.to_string(),
            summative_contribution: result.summative_contribution.to_string(),
            final_average: result.final_average.to_string(),
            classification: line.classification.label(),
        })?;
    }

    writer.serialize(ReportRow {
        student_id: card.student_id,
        term,
        subject: "GENERAL".to_string(),
        lesson1: String::new(),
        lesson2: String::new(),
        experiential: String::new(),
        project: String::new(),
        exam: String::new(),
        formative_average: card.general_formative_average.to_string(),
        formative_contribution: String::new(),
        summative_average: card.general_summative_average.to_string(),
        summative_contribution: String::new(),
        final_average: card.general_average.to_string(),
        classification: card.classification.label(),
    })?;

    Ok(())
}

/// Writes a report card as CSV: one row per subject with its raw scores and
/// averages, then a `GENERAL` row carrying the general averages.
pub fn write_report_card(path: &str, card: &ReportCard) -> Result<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    write_card_rows(&mut writer, card)?;
    writer.flush()?;

    info!(path, subjects = card.subjects.len(), "Report card written");
    Ok(())
}

/// Writes a multi-term student report as CSV, one report card block per term.
pub fn write_student_report(path: &str, report: &StudentReport) -> Result<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    for card in &report.terms {
        write_card_rows(&mut writer, card)?;
    }
    writer.flush()?;

    info!(path, terms = report.terms.len(), "Student report written");
    Ok(())
}
