use crate::curriculum::{Grade, SubjectDefinition};
use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{
    db_conn, params_obj, query_failed, required_grade, required_str, required_term,
};
use crate::ipc::types::{AppState, Request};
use crate::marks::{self, MarkEntryError, PreparedMark};
use crate::policy::PolicyTable;
use crate::terms::Term;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

const MARKS_BULK_MAX_ENTRIES: usize = 5000;

impl From<MarkEntryError> for HandlerErr {
    fn from(e: MarkEntryError) -> Self {
        HandlerErr::new(e.code(), e.to_string())
    }
}

fn student_grade(conn: &Connection, student_id: &str) -> Result<Grade, HandlerErr> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT grade FROM students WHERE id = ?",
            [student_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(query_failed)?;
    let Some(raw) = raw else {
        return Err(HandlerErr::not_found("student not found"));
    };
    raw.parse::<Grade>()
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))
}

/// Grade subject lists, loaded once per request.
struct SubjectCache<'c> {
    conn: &'c Connection,
    by_grade: HashMap<Grade, Vec<SubjectDefinition>>,
}

impl<'c> SubjectCache<'c> {
    fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            by_grade: HashMap::new(),
        }
    }

    fn subjects(&mut self, grade: Grade) -> Result<&[SubjectDefinition], HandlerErr> {
        if !self.by_grade.contains_key(&grade) {
            let loaded = db::load_grade_subjects(self.conn, grade).map_err(query_failed)?;
            self.by_grade.insert(grade, loaded);
        }
        Ok(self
            .by_grade
            .get(&grade)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }
}

/// Validate and store one subject mark for a student.
fn apply_entry(
    conn: &Connection,
    cache: &mut SubjectCache<'_>,
    policies: &PolicyTable,
    student_id: &str,
    term: Term,
    entry: &Map<String, Value>,
) -> Result<PreparedMark, HandlerErr> {
    let Some(subject) = entry.get("subject").and_then(|v| v.as_str()) else {
        return Err(HandlerErr::bad_params("missing subject"));
    };
    let grade = student_grade(conn, student_id)?;
    let subjects = cache.subjects(grade)?;
    let def = marks::resolve_subject(subjects, subject)?;
    let prepared = marks::prepare_mark(def, policies.policy_for(grade), entry)?;

    db::upsert_subject_mark(conn, student_id, term, &prepared.mark).map_err(|e| {
        HandlerErr::new("db_update_failed", e.to_string())
            .with_details(json!({ "table": "subject_marks" }))
    })?;
    Ok(prepared)
}

fn marks_get(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = db_conn(state)?;
    let student_id = required_str(req, "studentId")?;
    let exam_id = required_str(req, "examId")?;
    let Some(student) = db::load_student(conn, &student_id).map_err(query_failed)? else {
        return Err(HandlerErr::not_found("student not found"));
    };

    Ok(json!({
        "studentId": student.id,
        "grade": student.grade,
        "exam": student.exam(&exam_id)
    }))
}

fn marks_set(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = db_conn(state)?;
    let student_id = required_str(req, "studentId")?;
    let term = required_term(req, "examId")?;
    let cfg = db::load_calc_config(conn).map_err(query_failed)?;
    let mut cache = SubjectCache::new(conn);

    let prepared = apply_entry(
        conn,
        &mut cache,
        &cfg.policies,
        &student_id,
        term,
        &params_obj(req),
    )?;

    Ok(json!({
        "subject": prepared.mark.subject,
        "mark": prepared.mark,
        "clamped": prepared.clamped
    }))
}

fn marks_bulk_set(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = db_conn(state)?;
    let term = required_term(req, "examId")?;
    let Some(entries) = req.params.get("entries").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("missing entries[]"));
    };
    if entries.len() > MARKS_BULK_MAX_ENTRIES {
        return Err(HandlerErr::bad_params(format!(
            "bulk payload exceeds max entries: {} > {}",
            entries.len(),
            MARKS_BULK_MAX_ENTRIES
        ))
        .with_details(json!({ "limitExceeded": true })));
    }

    let cfg = db::load_calc_config(conn).map_err(query_failed)?;
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    let mut cache = SubjectCache::new(&tx);

    let mut applied: usize = 0;
    let mut errors: Vec<Value> = Vec::new();
    let mut clamped: Vec<Value> = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        let Some(obj) = entry.as_object() else {
            errors.push(json!({
                "index": i,
                "code": "bad_params",
                "message": format!("entry at index {} must be an object", i),
            }));
            continue;
        };
        let Some(student_id) = obj.get("studentId").and_then(|v| v.as_str()) else {
            errors.push(json!({
                "index": i,
                "code": "bad_params",
                "message": format!("entry at index {} missing studentId", i),
            }));
            continue;
        };

        match apply_entry(&tx, &mut cache, &cfg.policies, student_id, term, obj) {
            Ok(prepared) => {
                applied += 1;
                if !prepared.clamped.is_empty() {
                    clamped.push(json!({
                        "index": i,
                        "studentId": student_id,
                        "subject": prepared.mark.subject,
                        "fields": prepared.clamped,
                    }));
                }
            }
            Err(e) => errors.push(json!({
                "index": i,
                "studentId": student_id,
                "code": e.code,
                "message": e.message,
            })),
        }
    }

    drop(cache);
    tx.commit()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    tracing::info!(
        "bulk marks for {}: {} applied, {} rejected, {} clamped",
        term.id(),
        applied,
        errors.len(),
        clamped.len()
    );

    Ok(json!({
        "ok": true,
        "applied": applied,
        "rejected": errors.len(),
        "errors": errors,
        "clamped": clamped
    }))
}

fn exams_reset(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = db_conn(state)?;
    let grade = required_grade(req, "grade")?;
    let term = required_term(req, "examId")?;

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    let delete_failed = |table: &'static str| {
        move |e: rusqlite::Error| {
            HandlerErr::new("db_delete_failed", e.to_string())
                .with_details(json!({ "table": table }))
        }
    };
    let marks_deleted = tx
        .execute(
            "DELETE FROM subject_marks
             WHERE exam_id = ?
               AND student_id IN (SELECT id FROM students WHERE grade = ?)",
            (term.id(), grade.as_str()),
        )
        .map_err(delete_failed("subject_marks"))?;
    let exams_deleted = tx
        .execute(
            "DELETE FROM exams
             WHERE exam_id = ?
               AND student_id IN (SELECT id FROM students WHERE grade = ?)",
            (term.id(), grade.as_str()),
        )
        .map_err(delete_failed("exams"))?;
    tx.commit()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    tracing::info!(
        "reset {} for grade {}: {} exams, {} marks removed",
        term.id(),
        grade,
        exams_deleted,
        marks_deleted
    );

    Ok(json!({
        "grade": grade,
        "examId": term.id(),
        "examsDeleted": exams_deleted,
        "marksDeleted": marks_deleted
    }))
}

fn required_count(req: &Request, key: &str) -> Result<u32, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a non-negative integer", key)))
}

fn attendance_set(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = db_conn(state)?;
    let student_id = required_str(req, "studentId")?;
    let term = required_term(req, "examId")?;
    let total = required_count(req, "totalWorkingDays")?;
    let requested = required_count(req, "daysPresent")?;
    let present = requested.min(total);

    student_grade(conn, &student_id)?;
    db::ensure_exam(conn, &student_id, term).map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string()).with_details(json!({ "table": "exams" }))
    })?;
    conn.execute(
        "UPDATE exams SET total_working_days = ?, days_present = ?, updated_at = ?
         WHERE student_id = ? AND exam_id = ?",
        (total, present, db::now_stamp(), &student_id, term.id()),
    )
    .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;

    Ok(json!({
        "totalWorkingDays": total,
        "daysPresent": present,
        "clamped": present != requested
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let outcome = match req.method.as_str() {
        "marks.get" => marks_get(state, req),
        "marks.set" => marks_set(state, req),
        "marks.bulkSet" => marks_bulk_set(state, req),
        "exams.reset" => exams_reset(state, req),
        "attendance.set" => attendance_set(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, outcome))
}
