use crate::calc::StudentStatus;
use crate::curriculum::Grade;
use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{db_conn, optional_str, parse_grade, query_failed, required_str};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn parse_status(raw: Option<String>) -> Result<Option<StudentStatus>, HandlerErr> {
    raw.map(|s| {
        s.parse::<StudentStatus>()
            .map_err(|e| HandlerErr::bad_params(e.to_string()))
    })
    .transpose()
}

fn student_exists(conn: &Connection, student_id: &str) -> Result<bool, HandlerErr> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM students WHERE id = ?", [student_id], |r| {
            r.get(0)
        })
        .optional()
        .map_err(query_failed)?;
    Ok(found.is_some())
}

fn next_sort_order(conn: &Connection, grade: Grade) -> Result<i64, HandlerErr> {
    conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM students WHERE grade = ?",
        [grade.as_str()],
        |r| r.get(0),
    )
    .map_err(query_failed)
}

fn students_list(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let Some(conn) = state.db.as_ref() else {
        return Ok(json!({ "students": [] }));
    };
    let grade = optional_str(req, "grade")?
        .map(|g| parse_grade(&g))
        .transpose()?;

    let mut stmt = conn
        .prepare(
            "SELECT id, full_name, roll_no, grade, status, sort_order, updated_at
             FROM students
             WHERE (?1 IS NULL OR grade = ?1)
             ORDER BY grade, sort_order, full_name",
        )
        .map_err(query_failed)?;
    let students = stmt
        .query_map([grade.map(Grade::as_str)], |r| {
            let id: String = r.get(0)?;
            let full_name: String = r.get(1)?;
            let roll_no: Option<String> = r.get(2)?;
            let grade: String = r.get(3)?;
            let status: String = r.get(4)?;
            let sort_order: i64 = r.get(5)?;
            let updated_at: Option<String> = r.get(6)?;
            Ok(json!({
                "id": id,
                "fullName": full_name,
                "rollNo": roll_no,
                "grade": grade,
                "status": status,
                "sortOrder": sort_order,
                "updatedAt": updated_at
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_failed)?;

    Ok(json!({ "students": students }))
}

fn students_create(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let full_name = required_str(req, "fullName")?.trim().to_string();
    if full_name.is_empty() {
        return Err(HandlerErr::bad_params("fullName must not be empty"));
    }
    let grade = parse_grade(&required_str(req, "grade")?)?;
    let roll_no = optional_str(req, "rollNo")?;
    let status = parse_status(optional_str(req, "status")?)?.unwrap_or(StudentStatus::Active);

    let student_id = Uuid::new_v4().to_string();
    let sort_order = next_sort_order(conn, grade)?;
    conn.execute(
        "INSERT INTO students(id, full_name, roll_no, grade, status, sort_order, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &student_id,
            &full_name,
            &roll_no,
            grade.as_str(),
            status.as_str(),
            sort_order,
            db::now_stamp(),
        ),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string())
            .with_details(json!({ "table": "students" }))
    })?;

    Ok(json!({
        "studentId": student_id,
        "fullName": full_name,
        "grade": grade,
        "status": status,
        "sortOrder": sort_order
    }))
}

fn students_update(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let student_id = required_str(req, "studentId")?;
    if !student_exists(conn, &student_id)? {
        return Err(HandlerErr::not_found("student not found"));
    }

    let full_name = optional_str(req, "fullName")?.map(|s| s.trim().to_string());
    if full_name.as_deref() == Some("") {
        return Err(HandlerErr::bad_params("fullName must not be empty"));
    }
    let grade = optional_str(req, "grade")?
        .map(|g| parse_grade(&g))
        .transpose()?;
    let status = parse_status(optional_str(req, "status")?)?;
    let roll_no_present = req.params.get("rollNo").is_some();
    let roll_no = optional_str(req, "rollNo")?;

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    let update_failed = |e: rusqlite::Error| HandlerErr::new("db_update_failed", e.to_string());

    if let Some(name) = &full_name {
        tx.execute(
            "UPDATE students SET full_name = ? WHERE id = ?",
            (name, &student_id),
        )
        .map_err(update_failed)?;
    }
    if let Some(g) = grade {
        let sort_order = next_sort_order(&tx, g)?;
        tx.execute(
            "UPDATE students SET grade = ?, sort_order = ? WHERE id = ? AND grade <> ?",
            (g.as_str(), sort_order, &student_id, g.as_str()),
        )
        .map_err(update_failed)?;
    }
    if let Some(s) = status {
        tx.execute(
            "UPDATE students SET status = ? WHERE id = ?",
            (s.as_str(), &student_id),
        )
        .map_err(update_failed)?;
    }
    if roll_no_present {
        tx.execute(
            "UPDATE students SET roll_no = ? WHERE id = ?",
            (&roll_no, &student_id),
        )
        .map_err(update_failed)?;
    }
    tx.execute(
        "UPDATE students SET updated_at = ? WHERE id = ?",
        (db::now_stamp(), &student_id),
    )
    .map_err(update_failed)?;
    tx.commit()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;

    Ok(json!({ "ok": true }))
}

fn students_delete(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let student_id = required_str(req, "studentId")?;
    if !student_exists(conn, &student_id)? {
        return Err(HandlerErr::not_found("student not found"));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    // Dependency order; there is no ON DELETE CASCADE.
    for table in ["subject_marks", "exams", "students"] {
        let column = if table == "students" { "id" } else { "student_id" };
        tx.execute(
            &format!("DELETE FROM {} WHERE {} = ?", table, column),
            [&student_id],
        )
        .map_err(|e| {
            HandlerErr::new("db_delete_failed", e.to_string())
                .with_details(json!({ "table": table }))
        })?;
    }
    tx.commit()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;

    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "students.list" => students_list(state, req),
        "students.create" => students_create(state, req),
        "students.update" => students_update(state, req),
        "students.delete" => students_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, outcome))
}
