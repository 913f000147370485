use crate::curriculum::{Grade, SubjectDefinition};
use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{db_conn, optional_str, parse_grade, query_failed, required_grade};
use crate::ipc::types::{AppState, Request};
use crate::subjects;
use serde_json::json;
use std::collections::HashSet;

fn grade_json(grade: Grade, subjects: &[SubjectDefinition]) -> serde_json::Value {
    json!({
        "grade": grade,
        "band": grade.band().key(),
        "subjects": subjects
    })
}

fn curriculum_get(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let curriculum = db::load_curriculum(conn).map_err(query_failed)?;

    if let Some(raw) = optional_str(req, "grade")? {
        let grade = parse_grade(&raw)?;
        return Ok(grade_json(grade, curriculum.subjects(grade)));
    }
    let grades: Vec<serde_json::Value> = Grade::ALL
        .iter()
        .map(|g| grade_json(*g, curriculum.subjects(*g)))
        .collect();
    Ok(json!({ "grades": grades }))
}

fn validate_subjects(subjects: &[SubjectDefinition]) -> Result<(), HandlerErr> {
    let mut seen = HashSet::new();
    for (i, s) in subjects.iter().enumerate() {
        let key = subjects::normalize(&s.name);
        if key.is_empty() {
            return Err(HandlerErr::bad_params("subject name must not be empty")
                .with_details(json!({ "index": i })));
        }
        if !seen.insert(key) {
            return Err(
                HandlerErr::bad_params(format!("duplicate subject: {}", s.name))
                    .with_details(json!({ "index": i })),
            );
        }
        let marks_ok = |v: f64| v.is_finite() && v >= 0.0;
        if !marks_ok(s.exam_full_marks) || !marks_ok(s.activity_full_marks) {
            return Err(HandlerErr::bad_params(format!(
                "full marks for {} must be non-negative numbers",
                s.name
            ))
            .with_details(json!({ "index": i })));
        }
    }
    Ok(())
}

fn curriculum_set_grade(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let grade = required_grade(req, "grade")?;
    let Some(raw_subjects) = req.params.get("subjects") else {
        return Err(HandlerErr::bad_params("missing subjects"));
    };
    let subjects: Vec<SubjectDefinition> = serde_json::from_value(raw_subjects.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid subjects: {}", e)))?;
    validate_subjects(&subjects)?;

    db::replace_grade_subjects(conn, grade, &subjects)
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    tracing::info!(
        "curriculum for grade {} set to {} subjects",
        grade,
        subjects.len()
    );

    Ok(json!({ "grade": grade, "subjectCount": subjects.len() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "curriculum.get" => curriculum_get(state, req),
        "curriculum.setGrade" => curriculum_set_grade(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, outcome))
}
