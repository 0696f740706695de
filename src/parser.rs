//! JSON decoding of single-field score updates.

use crate::error::{GradeError, GradeResult};
use crate::grading::{Score, ScoreField, ScoreUpdate, Term};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Wire form of an update; `value` may be a number, a decimal string, an
/// empty string or null.
#[derive(Debug, Deserialize)]
struct UpdatePayload {
    student_id: u32,
    subject_id: u32,
    term: Term,
    field: ScoreField,
    #[serde(default, deserialize_with = "blank_as_absent")]
    value: Option<Score>,
}

fn blank_as_absent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Score>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(other) => Score::deserialize(other).map(Some).map_err(de::Error::custom),
    }
}

impl From<UpdatePayload> for ScoreUpdate {
    fn from(p: UpdatePayload) -> Self {
        ScoreUpdate {
            student_id: p.student_id,
            subject_id: p.subject_id,
            term: p.term,
            field: p.field,
            value: p.value.filter(|s| !s.is_zero()),
        }
    }
}

/// Decodes one JSON update object.
///
/// # Errors
///
/// Returns [`GradeError::Json`] if the bytes are not a valid update.
pub fn parse_update(bytes: &[u8]) -> GradeResult<ScoreUpdate> {
    parse_line(bytes, 1)
}

/// Decodes JSON lines, one update per line. Blank lines are skipped and each
/// line fails independently, with its 1-based line number in the error.
pub fn parse_updates(text: &str) -> Vec<GradeResult<ScoreUpdate>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_line(line.as_bytes(), i + 1))
        .collect()
}

fn parse_line(bytes: &[u8], line: usize) -> GradeResult<ScoreUpdate> {
    serde_json::from_slice::<UpdatePayload>(bytes)
        .map(ScoreUpdate::from)
        .map_err(|source| GradeError::Json { line, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_value() {
        let update = parse_update(
            br#"{"student_id": 4, "subject_id": 2, "term": 1, "field": "lesson2", "value": 8.5}"#,
        )
        .unwrap();

        assert_eq!(update.student_id, 4);
        assert_eq!(update.subject_id, 2);
        assert_eq!(update.term, Term::First);
        assert_eq!(update.field, ScoreField::Lesson2);
        assert_eq!(update.value, Some(Score::from_hundredths(850)));
    }

    #[test]
    fn test_parse_string_value() {
        let update = parse_update(
            br#"{"student_id": 4, "subject_id": 2, "term": 3, "field": "exam", "value": "6.75"}"#,
        )
        .unwrap();
        assert_eq!(update.value, Some(Score::from_hundredths(675)));
    }

    #[test]
    fn test_blank_null_and_zero_clear_the_field() {
        for value in [r#""""#, "null", "0", r#""0.00""#] {
            let json = format!(
                r#"{{"student_id": 1, "subject_id": 1, "term": 2, "field": "project", "value": {value}}}"#
            );
            let update = parse_update(json.as_bytes()).unwrap();
            assert_eq!(update.value, None, "value {value} should clear");
        }
    }

    #[test]
    fn test_parse_rejects_bad_payloads() {
        let cases: [&[u8]; 4] = [
            br#"{"student_id": 1, "subject_id": 1, "term": 4, "field": "exam", "value": 5}"#,
            br#"{"student_id": 1, "subject_id": 1, "term": 1, "field": "grade", "value": 5}"#,
            br#"{"student_id": 1, "subject_id": 1, "term": 1, "field": "exam", "value": "five"}"#,
            b"not json",
        ];
        for bytes in cases {
            assert!(matches!(
                parse_update(bytes),
                Err(GradeError::Json { line: 1, .. })
            ));
        }
    }

    #[test]
    fn test_parse_lines_reports_line_numbers() {
        let text = r#"{"student_id": 1, "subject_id": 1, "term": 1, "field": "lesson1", "value": 9}

{"student_id": 1, "subject_id": 1, "term": 1, "field": "bogus", "value": 9}
{"student_id": 2, "subject_id": 1, "term": 1, "field": "exam", "value": "7"}
"#;
        let results = parse_updates(text);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(GradeError::Json { line: 3, .. })));
        assert_eq!(results[2].as_ref().unwrap().student_id, 2);
    }
}
