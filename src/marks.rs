//! Mark-entry validation. Values are clamped to the subject's full marks
//! here so the calculator only ever sees in-range numbers.

use crate::calc::{OabcGrade, SubjectMark};
use crate::curriculum::SubjectDefinition;
use crate::policy::BandPolicy;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkEntryError {
    #[error("{field} must be a number or null")]
    NotNumeric { field: &'static str },
    #[error("{field} is not used for {subject}: {reason}")]
    FieldNotAllowed {
        field: &'static str,
        subject: String,
        reason: &'static str,
    },
    #[error("grade must be one of O, A, B, C or null")]
    BadGrade,
    #[error("subject {0:?} is not in this grade's curriculum")]
    UnknownSubject(String),
}

impl MarkEntryError {
    pub fn code(&self) -> &'static str {
        match self {
            MarkEntryError::UnknownSubject(_) => "not_found",
            _ => "bad_params",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedMark {
    pub mark: SubjectMark,
    /// Fields whose submitted value was pulled into `[0, fullMarks]`.
    pub clamped: Vec<&'static str>,
}

/// Curriculum entry a submitted subject name refers to. Exact names win
/// over aliases.
pub fn resolve_subject<'a>(
    subjects: &'a [SubjectDefinition],
    submitted: &str,
) -> Result<&'a SubjectDefinition, MarkEntryError> {
    crate::subjects::find_by_name(subjects, submitted, |d| d.name.as_str())
        .ok_or_else(|| MarkEntryError::UnknownSubject(submitted.to_string()))
}

fn read_number(
    params: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<f64>, MarkEntryError> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or(MarkEntryError::NotNumeric { field }),
    }
}

fn clamp(
    value: f64,
    full_marks: f64,
    field: &'static str,
    clamped: &mut Vec<&'static str>,
) -> f64 {
    let out = value.clamp(0.0, full_marks.max(0.0));
    if out != value {
        clamped.push(field);
    }
    out
}

fn reject_present(
    params: &Map<String, Value>,
    field: &'static str,
    def: &SubjectDefinition,
    reason: &'static str,
) -> Result<(), MarkEntryError> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(_) => Err(MarkEntryError::FieldNotAllowed {
            field,
            subject: def.name.clone(),
            reason,
        }),
    }
}

/// Build the stored record for one subject from submitted params. The
/// submitted fields replace the whole record.
pub fn prepare_mark(
    def: &SubjectDefinition,
    policy: &BandPolicy,
    params: &Map<String, Value>,
) -> Result<PreparedMark, MarkEntryError> {
    let mut clamped = Vec::new();
    let mut mark = SubjectMark {
        subject: def.name.clone(),
        ..SubjectMark::default()
    };

    if def.is_graded() {
        for field in ["marks", "examMarks", "activityMarks"] {
            reject_present(params, field, def, "subject is OABC graded")?;
        }
        mark.grade = match params.get("grade") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(
                s.parse::<OabcGrade>()
                    .map_err(|_| MarkEntryError::BadGrade)?,
            ),
            Some(_) => return Err(MarkEntryError::BadGrade),
        };
        return Ok(PreparedMark { mark, clamped });
    }

    reject_present(params, "grade", def, "subject is marked numerically")?;
    if policy.has_activities {
        reject_present(params, "marks", def, "use examMarks and activityMarks")?;
        mark.exam_marks = read_number(params, "examMarks")?
            .map(|v| clamp(v, def.exam_full_marks, "examMarks", &mut clamped));
        mark.activity_marks = read_number(params, "activityMarks")?
            .map(|v| clamp(v, def.activity_full_marks, "activityMarks", &mut clamped));
    } else {
        reject_present(params, "activityMarks", def, "grade band has no activities")?;
        let value = match read_number(params, "marks")? {
            Some(v) => Some(v),
            None => read_number(params, "examMarks")?,
        };
        mark.marks = value.map(|v| clamp(v, def.exam_full_marks, "marks", &mut clamped));
    }

    Ok(PreparedMark { mark, clamped })
}
