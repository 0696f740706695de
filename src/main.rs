//! CLI entry point for the gradebook tool.
//!
//! Provides subcommands for computing a grade from raw scores, updating the
//! CSV register one field at a time, and building report cards, student
//! reports and class summaries from it.
//!
//! Commands that modify the register load it, apply changes and save it back
//! without locking; run one writer per register file at a time.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gradebook::config::{Settings, parse_id_list};
use gradebook::grading::report::{class_summary, report_card, student_report};
use gradebook::grading::{RawScores, Score, ScoreField, ScoreUpdate, Term, compute};
use gradebook::output::{
    append_record, print_json, print_pretty, write_report_card, write_student_report,
};
use gradebook::parser::parse_updates;
use gradebook::roster::Roster;
use gradebook::store::GradeBook;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gradebook")]
#[command(about = "Weighted grade averages, report cards and class summaries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute averages and classification from five raw scores (0 = not entered)
    Compute {
        #[arg(long, default_value = "0")]
        lesson1: Score,
        #[arg(long, default_value = "0")]
        lesson2: Score,
        #[arg(long, default_value = "0")]
        experiential: Score,
        #[arg(long, default_value = "0")]
        project: Score,
        #[arg(long, default_value = "0")]
        exam: Score,

        /// CSV file to append the result to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Set one score of one record in the register and recompute it
    Update {
        #[arg(long)]
        student: u32,
        #[arg(long)]
        subject: u32,
        /// Term number (1, 2 or 3)
        #[arg(long)]
        term: Term,
        /// lesson1, lesson2, experiential, project or exam
        #[arg(long)]
        field: ScoreField,
        /// New value; omit or pass 0 to clear the score
        #[arg(long)]
        value: Option<Score>,

        /// Register CSV file (defaults to GRADEBOOK_DATA)
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Apply a JSON-lines file of single-field updates to the register
    Apply {
        /// Path to the JSON-lines file
        #[arg(value_name = "FILE")]
        source: String,

        #[arg(short, long)]
        data: Option<String>,
    },
    /// Build a student's report card for one term
    Report {
        #[arg(long)]
        student: u32,
        #[arg(long)]
        term: Term,
        /// Comma-separated subject ids (defaults to GRADEBOOK_SUBJECTS, then the
        /// subject list, then every subject in the register)
        #[arg(long)]
        subjects: Option<String>,

        /// CSV file to export the report card to
        #[arg(short, long)]
        output: Option<String>,

        #[arg(short, long)]
        data: Option<String>,
    },
    /// Build a student's report over every term with recorded grades
    Transcript {
        #[arg(long)]
        student: u32,

        /// CSV file to export the report to
        #[arg(short, long)]
        output: Option<String>,

        #[arg(short, long)]
        data: Option<String>,
    },
    /// Count standings for one subject and term across enrolled students
    Summary {
        #[arg(long)]
        subject: u32,
        #[arg(long)]
        term: Term,
        /// Only students enrolled in this grade
        #[arg(long)]
        grade: Option<String>,
        /// Only students enrolled in this section
        #[arg(long)]
        section: Option<String>,

        #[arg(short, long)]
        data: Option<String>,
    },
    /// Reload the register, recomputing every record, and save it back
    Recompute {
        #[arg(short, long)]
        data: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let settings = Settings::from_env()?;

    // Logging setup: colored stderr + JSON rolling log file
    let log_dir = Path::new(&settings.log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&settings.log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gradebook.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compute {
            lesson1,
            lesson2,
            experiential,
            project,
            exam,
            output,
        } => {
            let raw = RawScores::from_legacy(lesson1, lesson2, experiential, project, exam);
            let result = compute(raw);

            info!(
                final_average = %result.final_average,
                classification = %result.classification(),
                "Grade computed"
            );
            print_pretty(&raw);
            print_json(&result)?;

            if let Some(path) = output {
                append_record(&path, &result)?;
            }
        }
        Commands::Update {
            student,
            subject,
            term,
            field,
            value,
            data,
        } => {
            let data = data.unwrap_or_else(|| settings.data_file.clone());
            let mut book = load_register(&data)?;

            let update = ScoreUpdate {
                student_id: student,
                subject_id: subject,
                term,
                field,
                value: value.filter(|v| !v.is_zero()),
            };
            let record = book.apply_update(&update);
            print_json(record)?;

            book.save_csv(&data)?;
        }
        Commands::Apply { source, data } => {
            let data = data.unwrap_or_else(|| settings.data_file.clone());
            apply_file(&source, &data)?;
        }
        Commands::Report {
            student,
            term,
            subjects,
            output,
            data,
        } => {
            let data = data.unwrap_or_else(|| settings.data_file.clone());
            let book = load_register(&data)?;
            let roster = load_roster(&settings)?;

            let subject_ids = match subjects {
                Some(list) => parse_id_list(&list)?,
                None if !settings.default_subjects.is_empty() => settings.default_subjects.clone(),
                None if roster.has_subjects() => roster.subject_ids(),
                None => book.subject_ids(),
            };
            if subject_ids.is_empty() {
                warn!("No subjects to report on");
            }

            let card = report_card(&book, &roster, student, term, &subject_ids);
            info!(
                student,
                term = %term,
                general_average = %card.general_average,
                classification = %card.classification,
                graded = card.graded_subjects,
                "Report card"
            );
            print_json(&card)?;

            if let Some(path) = output {
                write_report_card(&path, &card)?;
            }
        }
        Commands::Transcript {
            student,
            output,
            data,
        } => {
            let data = data.unwrap_or_else(|| settings.data_file.clone());
            let book = load_register(&data)?;
            let roster = load_roster(&settings)?;

            let report = student_report(&book, &roster, student);
            if report.terms.is_empty() {
                warn!(student, "No grades recorded for student");
            }
            info!(student, terms = report.terms.len(), "Student report");
            print_json(&report)?;

            if let Some(path) = output {
                write_student_report(&path, &report)?;
            }
        }
        Commands::Summary {
            subject,
            term,
            grade,
            section,
            data,
        } => {
            let data = data.unwrap_or_else(|| settings.data_file.clone());
            let book = load_register(&data)?;
            let roster = load_roster(&settings)?;

            // Without an enrolment list, everyone with a register row is the class.
            let students = if roster.has_students() {
                roster.student_ids(grade.as_deref(), section.as_deref())
            } else {
                if grade.is_some() || section.is_some() {
                    warn!("No enrolled students loaded, ignoring grade and section filters");
                }
                book.student_ids()
            };

            let summary = class_summary(&book, &roster, subject, term, &students);
            info!(
                subject,
                term = %term,
                total = summary.total_students,
                with_data = summary.students_with_data,
                passed = summary.passed,
                conditional = summary.conditional,
                failed = summary.failed,
                no_data = summary.no_data,
                "Class summary"
            );
            print_json(&summary)?;
        }
        Commands::Recompute { data } => {
            let data = data.unwrap_or_else(|| settings.data_file.clone());
            let book = load_register(&data)?;
            book.save_csv(&data)?;
        }
    }

    Ok(())
}

fn load_register(path: &str) -> Result<GradeBook> {
    GradeBook::load_csv(path).with_context(|| format!("failed to load register '{path}'"))
}

fn load_roster(settings: &Settings) -> Result<Roster> {
    Roster::load_csv(&settings.students_file, &settings.subjects_file)
        .context("failed to load student and subject lists")
}

/// Applies every valid update in a JSON-lines file, then saves the register once.
/// Malformed lines are logged and skipped.
#[tracing::instrument]
fn apply_file(source: &str, data: &str) -> Result<()> {
    let text = std::fs::read_to_string(source)
        .with_context(|| format!("failed to read updates from '{source}'"))?;
    let mut book = load_register(data)?;

    let mut applied = 0usize;
    let mut skipped = 0usize;

    for result in parse_updates(&text) {
        match result {
            Ok(update) => {
                book.apply_update(&update);
                applied += 1;
            }
            Err(e) => {
                error!(error = %e, "Skipping update");
                skipped += 1;
            }
        }
    }

    book.save_csv(data)?;
    info!(applied, skipped, records = book.len(), "Updates applied");
    Ok(())
}
