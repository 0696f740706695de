//! The grade register: one record per student, subject and term.
//!
//! Every write recomputes the whole record from its raw scores and replaces
//! it. Mutation takes `&mut self`; share a register across threads behind a
//! `Mutex` so that each read-modify-write cycle stays serialized.
//!
//! The CSV file has a single writer. Nothing locks it between `load_csv` and
//! `save_csv`, so two processes updating the same file concurrently lose one
//! side's changes.

use crate::error::{GradeError, GradeResult};
use crate::grading::{
    AggregateResult, Classification, Grade, GradeKey, GradeRecord, RawScores, Score,
    ScoreField, ScoreUpdate, Term,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone)]
pub struct GradeBook {
    records: BTreeMap<GradeKey, GradeRecord>,
}

impl GradeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &GradeKey) -> Option<&GradeRecord> {
        self.records.get(key)
    }

    /// Records in key order.
    pub fn iter(&self) -> impl Iterator<Item = &GradeRecord> {
        self.records.values()
    }

    /// Writes `raw` under `key` with a freshly computed result.
    ///
    /// An existing record keeps its notes and creation time.
    pub fn upsert(&mut self, key: GradeKey, raw: RawScores) -> &GradeRecord {
        let now = Utc::now();
        let record = match self.records.get(&key) {
            Some(existing) => existing.revised(raw, now),
            None => GradeRecord::new(key, raw, now),
        };

        debug!(
            %key,
            final_average = %record.result.final_average,
            classification = %record.result.classification(),
            "Grade recomputed"
        );

        self.records.insert(key, record);
        &self.records[&key]
    }

    /// Sets one field of a record, creating the record if needed, then
    /// recomputes the whole record.
    pub fn apply_update(&mut self, update: &ScoreUpdate) -> &GradeRecord {
        let key = update.key();
        let raw = self
            .records
            .get(&key)
            .map(|r| r.raw)
            .unwrap_or_default()
            .with(update.field, update.value);

        debug!(%key, field = %update.field, value = ?update.value, "Applying score update");
        self.upsert(key, raw)
    }

    /// Returns `false` when no record exists for `key`.
    pub fn set_notes(&mut self, key: &GradeKey, notes: Option<String>) -> bool {
        match self.records.get_mut(key) {
            Some(record) => {
                record.notes = notes;
                record.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &GradeKey) -> Option<GradeRecord> {
        self.records.remove(key)
    }

    pub fn student_ids(&self) -> Vec<u32> {
        let ids: BTreeSet<u32> = self.records.keys().map(|k| k.student_id).collect();
        ids.into_iter().collect()
    }

    pub fn subject_ids(&self) -> Vec<u32> {
        let ids: BTreeSet<u32> = self.records.keys().map(|k| k.subject_id).collect();
        ids.into_iter().collect()
    }

    pub fn records_for_student(
        &self,
        student_id: u32,
        term: Term,
    ) -> impl Iterator<Item = &GradeRecord> {
        self.records
            .values()
            .filter(move |r| r.key.student_id == student_id && r.key.term == term)
    }

    pub fn records_for_subject(
        &self,
        subject_id: u32,
        term: Term,
    ) -> impl Iterator<Item = &GradeRecord> {
        self.records
            .values()
            .filter(move |r| r.key.subject_id == subject_id && r.key.term == term)
    }

    /// Loads a register from CSV. A missing file yields an empty register.
    ///
    /// Derived columns are never trusted: each record is recomputed from its
    /// raw columns, and a stored value that disagrees is logged and replaced.
    pub fn load_csv(path: impl AsRef<Path>) -> GradeResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "Register file not found, starting empty");
            return Ok(Self::new());
        }

        let mut rdr = csv::Reader::from_path(path)?;
        let mut book = Self::new();
        let mut stale = 0usize;

        for result in rdr.deserialize() {
            let row: GradeRow = result?;
            let record = row.to_record();

            if row.stored_result().is_some_and(|stored| stored != record.result) {
                stale += 1;
                warn!(
                    key = %record.key,
                    stored = ?row.final_average,
                    computed = %record.result.final_average,
                    "Stored averages disagree with raw scores, recomputed"
                );
            }

            if book.records.insert(record.key, record).is_some() {
                warn!(key = %row.key(), "Duplicate register row, keeping the later one");
            }
        }

        info!(path = %path.display(), records = book.len(), stale, "Register loaded");
        Ok(book)
    }

    /// Writes the register to CSV, replacing the file.
    ///
    /// Rows go to a sibling `.tmp` file that is renamed over `path`; on any
    /// failure the temporary file is removed and `path` is left untouched.
    pub fn save_csv(&self, path: impl AsRef<Path>) -> GradeResult<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let tmp = path.with_extension("csv.tmp");
        let written = self
            .write_rows(&tmp)
            .and_then(|()| fs::rename(&tmp, path).map_err(GradeError::from));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                debug!(path = %tmp.display(), error = %cleanup, "Temporary register not removed");
            }
            return Err(e);
        }

        info!(path = %path.display(), records = self.len(), "Register saved");
        Ok(())
    }

    fn write_rows(&self, path: &Path) -> GradeResult<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in self.records.values() {
            writer.serialize(GradeRow::from(record))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Reads a decimal cell as text so that wide values never pass through `f64`.
/// An empty cell is `None`.
fn decimal_cell<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = GradeError>,
{
    Option::<String>::deserialize(deserializer)?
        .filter(|text| !text.trim().is_empty())
        .map(|text| text.parse().map_err(de::Error::custom))
        .transpose()
}

/// Flat CSV layout of a [`GradeRecord`]. Empty score cells are absent scores.
#[derive(Debug, Serialize, Deserialize)]
struct GradeRow {
    student_id: u32,
    subject_id: u32,
    term: Term,
    #[serde(deserialize_with = "decimal_cell")]
    lesson1: Option<Score>,
    #[serde(deserialize_with = "decimal_cell")]
    lesson2: Option<Score>,
    #[serde(deserialize_with = "decimal_cell")]
    experiential: Option<Score>,
    #[serde(deserialize_with = "decimal_cell")]
    project: Option<Score>,
    #[serde(deserialize_with = "decimal_cell")]
    exam: Option<Score>,
    #[serde(deserialize_with = "decimal_cell")]
    formative_average: Option<Grade>,
    #[serde(deserialize_with = "decimal_cell")]
    formative_contribution: Option<Grade>,
    #[serde(deserialize_with = "decimal_cell")]
    summative_average: Option<Grade>,
    #[serde(deserialize_with = "decimal_cell")]
    summative_contribution: Option<Grade>,
    #[serde(deserialize_with = "decimal_cell")]
    final_average: Option<Grade>,
    classification: Option<Classification>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GradeRow {
    fn key(&self) -> GradeKey {
        GradeKey::new(self.student_id, self.subject_id, self.term)
    }

    /// Raw columns, with a stored `0` read as not entered.
    fn raw(&self) -> RawScores {
        RawScores::default()
            .with(ScoreField::Lesson1, self.lesson1)
            .with(ScoreField::Lesson2, self.lesson2)
            .with(ScoreField::Experiential, self.experiential)
            .with(ScoreField::Project, self.project)
            .with(ScoreField::Exam, self.exam)
    }

    /// The derived columns as written, when all of them are present.
    fn stored_result(&self) -> Option<AggregateResult> {
        Some(AggregateResult {
            formative_average: self.formative_average?,
            formative_contribution: self.formative_contribution?,
            summative_average: self.summative_average?,
            summative_contribution: self.summative_contribution?,
            final_average: self.final_average?,
        })
    }

    fn to_record(&self) -> GradeRecord {
        let mut record = GradeRecord::new(self.key(), self.raw(), self.created_at);
        record.notes = self.notes.clone().filter(|n| !n.is_empty());
        record.updated_at = self.updated_at;
        record
    }
}

impl From<&GradeRecord> for GradeRow {
    fn from(record: &GradeRecord) -> Self {
        GradeRow {
            student_id: record.key.student_id,
            subject_id: record.key.subject_id,
            term: record.key.term,
            lesson1: record.raw.lesson1,
            lesson2: record.raw.lesson2,
            experiential: record.raw.experiential,
            project: record.raw.project,
            exam: record.raw.exam,
            formative_average: Some(record.result.formative_average),
            formative_contribution: Some(record.result.formative_contribution),
            summative_average: Some(record.result.summative_average),
            summative_contribution: Some(record.result.summative_contribution),
            final_average: Some(record.result.final_average),
            classification: Some(record.result.classification()),
            notes: record.notes.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn update(student_id: u32, field: ScoreField, value: &str) -> ScoreUpdate {
        ScoreUpdate {
            student_id,
            subject_id: 7,
            term: Term::First,
            field,
            value: Some(value.parse().unwrap()),
        }
    }

    #[test]
    fn test_apply_update_creates_record() {
        let mut book = GradeBook::new();
        let record = book.apply_update(&update(1, ScoreField::Lesson1, "8"));

        assert_eq!(record.raw.lesson1, Some(Score::from_hundredths(800)));
        assert_eq!(record.raw.lesson2, None);
        assert_eq!(record.result.formative_average.to_string(), "8.00");
        assert_eq!(record.result.final_average.to_string(), "5.60");
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_every_update_recomputes_whole_record() {
        let mut book = GradeBook::new();
        book.apply_update(&update(1, ScoreField::Lesson1, "8"));
        book.apply_update(&update(1, ScoreField::Lesson2, "6"));
        book.apply_update(&update(1, ScoreField::Project, "7"));
        let record = book.apply_update(&update(1, ScoreField::Exam, "5"));

        assert_eq!(record.result.formative_average.to_string(), "7.00");
        assert_eq!(record.result.summative_average.to_string(), "6.00");
        assert_eq!(record.result.final_average.to_string(), "6.70");
        assert_eq!(record.result, crate::grading::compute(record.raw));
    }

    #[test]
    fn test_clearing_a_field_recomputes() {
        let mut book = GradeBook::new();
        book.apply_update(&update(1, ScoreField::Lesson1, "10"));
        book.apply_update(&update(1, ScoreField::Lesson2, "4"));

        let mut clear = update(1, ScoreField::Lesson2, "0");
        clear.value = None;
        let record = book.apply_update(&clear);

        assert_eq!(record.raw.lesson2, None);
        assert_eq!(record.result.formative_average.to_string(), "10.00");
    }

    #[test]
    fn test_upsert_keeps_notes_and_creation_time() {
        let mut book = GradeBook::new();
        let key = GradeKey::new(1, 7, Term::Second);
        let created_at = book.upsert(key, RawScores::default()).created_at;
        assert!(book.set_notes(&key, Some("medical leave".into())));

        let raw = RawScores::default().with(ScoreField::Exam, Some(Score::from_hundredths(900)));
        let record = book.upsert(key, raw);

        assert_eq!(record.created_at, created_at);
        assert_eq!(record.notes.as_deref(), Some("medical leave"));
        assert!(!book.set_notes(&GradeKey::new(2, 7, Term::Second), None));
    }

    #[test]
    fn test_queries() {
        let mut book = GradeBook::new();
        book.apply_update(&update(2, ScoreField::Exam, "9"));
        book.apply_update(&update(1, ScoreField::Exam, "9"));
        book.upsert(GradeKey::new(1, 3, Term::Third), RawScores::default());

        assert_eq!(book.student_ids(), vec![1, 2]);
        assert_eq!(book.subject_ids(), vec![3, 7]);
        assert_eq!(book.records_for_student(1, Term::First).count(), 1);
        assert_eq!(book.records_for_subject(7, Term::First).count(), 2);
        assert_eq!(book.records_for_subject(7, Term::Third).count(), 0);

        assert!(book.remove(&GradeKey::new(1, 3, Term::Third)).is_some());
        assert_eq!(book.subject_ids(), vec![7]);
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/grades.csv");

        let mut book = GradeBook::new();
        book.apply_update(&update(1, ScoreField::Lesson1, "8.25"));
        book.apply_update(&update(1, ScoreField::Project, "6.999"));
        book.upsert(GradeKey::new(2, 7, Term::First), RawScores::default());
        book.set_notes(&GradeKey::new(2, 7, Term::First), Some("transferred".into()));
        book.save_csv(&path).unwrap();

        let loaded = GradeBook::load_csv(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        for record in book.iter() {
            assert_eq!(loaded.get(&record.key), Some(record));
        }
    }

    #[test]
    fn test_csv_round_trip_keeps_wide_scores_exact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grades.csv");

        let mut book = GradeBook::new();
        book.apply_update(&update(1, ScoreField::Exam, "12345678901.234567"));
        book.apply_update(&update(2, ScoreField::Exam, "999999999999.999999"));
        book.apply_update(&update(3, ScoreField::Lesson1, "-999999999999.999999"));
        book.save_csv(&path).unwrap();

        let loaded = GradeBook::load_csv(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        for record in book.iter() {
            assert_eq!(loaded.get(&record.key), Some(record));
        }

        let wide = loaded.get(&GradeKey::new(2, 7, Term::First)).unwrap();
        assert_eq!(wide.raw.exam.unwrap().to_string(), "999999999999.999999");
        assert_eq!(wide.result.summative_average.to_string(), "1000000000000.00");
    }

    #[test]
    fn test_save_failure_removes_temporary_file() {
        let dir = tempdir().unwrap();
        // A non-empty directory where the register should go makes the rename fail.
        let path = dir.path().join("grades.csv");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "").unwrap();

        let mut book = GradeBook::new();
        book.apply_update(&update(1, ScoreField::Exam, "9"));

        assert!(book.save_csv(&path).is_err());
        assert!(!path.with_extension("csv.tmp").exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn test_load_duplicate_rows_keeps_later() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grades.csv");
        let ts = "2025-01-10T12:00:00Z";
        let content = format!(
            "student_id,subject_id,term,lesson1,lesson2,experiential,project,exam,\
             formative_average,formative_contribution,summative_average,summative_contribution,\
             final_average,classification,notes,created_at,updated_at\n\
             1,7,1,4,,,,,,,,,,,first,{ts},{ts}\n\
             1,7,1,9,,,,,,,,,,,second,{ts},{ts}\n"
        );
        fs::write(&path, content).unwrap();

        let book = GradeBook::load_csv(&path).unwrap();
        assert_eq!(book.len(), 1);

        let record = book.get(&GradeKey::new(1, 7, Term::First)).unwrap();
        assert_eq!(record.raw.lesson1, Some(Score::from_hundredths(900)));
        assert_eq!(record.notes.as_deref(), Some("second"));
        assert_eq!(record.result.final_average.to_string(), "6.30");
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let book = GradeBook::load_csv(dir.path().join("absent.csv")).unwrap();
        assert!(book.is_empty());
    }

    #[test]
    fn test_load_recomputes_stale_derived_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grades.csv");
        let ts = "2025-01-10T12:00:00Z";
        let content = format!(
            "student_id,subject_id,term,lesson1,lesson2,experiential,project,exam,\
             formative_average,formative_contribution,summative_average,summative_contribution,\
             final_average,classification,notes,created_at,updated_at\n\
             1,7,1,8,6,0,7,5,9.99,9.99,9.99,9.99,9.99,PASSED,,{ts},{ts}\n\
             2,7,2,,,,,,,,,,,,,{ts},{ts}\n"
        );
        fs::write(&path, content).unwrap();

        let book = GradeBook::load_csv(&path).unwrap();
        let record = book.get(&GradeKey::new(1, 7, Term::First)).unwrap();

        assert_eq!(record.raw.experiential, None);
        assert_eq!(record.result.final_average.to_string(), "6.70");
        assert_eq!(record.result.classification(), Classification::Conditional);

        let empty = book.get(&GradeKey::new(2, 7, Term::Second)).unwrap();
        assert_eq!(empty.result.classification(), Classification::NoData);
        assert_eq!(empty.notes, None);
    }
}
