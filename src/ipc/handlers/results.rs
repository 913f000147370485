use crate::calc::{self, Student, StudentResult};
use crate::curriculum::{Curriculum, Grade};
use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{db_conn, query_failed, required_grade, required_str, required_term};
use crate::ipc::types::{AppState, Request};
use crate::policy::CalcConfig;
use crate::terms::Term;
use rusqlite::Connection;
use serde_json::{json, Value};

struct ClassContext {
    roster: Vec<Student>,
    curriculum: Curriculum,
    config: CalcConfig,
}

fn load_class(conn: &Connection, grade: Grade) -> Result<ClassContext, HandlerErr> {
    Ok(ClassContext {
        roster: db::load_roster(conn, grade).map_err(query_failed)?,
        curriculum: db::load_curriculum(conn).map_err(query_failed)?,
        config: db::load_calc_config(conn).map_err(query_failed)?,
    })
}

impl ClassContext {
    fn results(&self, grade: Grade, exam_id: &str) -> Vec<StudentResult> {
        calc::compute_class_results(
            &self.roster,
            grade,
            exam_id,
            &self.curriculum,
            &self.config,
        )
    }
}

fn results_class(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = db_conn(state)?;
    let grade = required_grade(req, "grade")?;
    let term = required_term(req, "examId")?;

    let class = load_class(conn, grade)?;
    let rows = class.results(grade, term.id());

    Ok(json!({
        "grade": grade,
        "examId": term.id(),
        "examName": term.name(),
        "rankingLaw": class.config.ranking_law,
        "rows": rows
    }))
}

fn results_student(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = db_conn(state)?;
    let student_id = required_str(req, "studentId")?;
    let term = required_term(req, "examId")?;

    let Some(student) = db::load_student(conn, &student_id).map_err(query_failed)? else {
        return Err(HandlerErr::not_found("student not found"));
    };
    let class = load_class(conn, student.grade)?;
    let Some(row) = class
        .results(student.grade, term.id())
        .into_iter()
        .find(|r| r.student_id == student_id)
    else {
        return Err(HandlerErr::not_found("student not found in grade roster"));
    };
    let attendance = student.exam(term.id()).and_then(|e| e.attendance);

    Ok(json!({
        "grade": student.grade,
        "examId": term.id(),
        "examName": term.name(),
        "result": row,
        "attendance": attendance
    }))
}

fn results_statement(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = db_conn(state)?;
    let grade = required_grade(req, "grade")?;
    let class = load_class(conn, grade)?;

    let per_term: Vec<(Term, Vec<StudentResult>)> = Term::ALL
        .iter()
        .map(|t| (*t, class.results(grade, t.id())))
        .collect();

    let students: Vec<Value> = class
        .roster
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let terms: Vec<Value> = per_term
                .iter()
                .map(|(term, rows)| {
                    let r = &rows[i];
                    json!({
                        "examId": term.id(),
                        "hasExam": r.has_exam,
                        "grandTotal": r.summary.grand_total,
                        "fullMarksTotal": r.summary.full_marks_total,
                        "percentage": r.summary.percentage,
                        "result": r.summary.result,
                        "division": r.summary.division,
                        "academicGrade": r.summary.academic_grade,
                        "failedSubjects": r.summary.failed_subjects,
                        "rank": r.rank
                    })
                })
                .collect();
            json!({
                "studentId": s.id,
                "fullName": s.full_name,
                "rollNo": s.roll_no,
                "status": s.status,
                "terms": terms
            })
        })
        .collect();

    let exams: Vec<Value> = Term::ALL
        .iter()
        .map(|t| json!({ "examId": t.id(), "examName": t.name() }))
        .collect();

    Ok(json!({
        "grade": grade,
        "rankingLaw": class.config.ranking_law,
        "exams": exams,
        "students": students
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let outcome = match req.method.as_str() {
        "results.class" => results_class(state, req),
        "results.student" => results_student(state, req),
        "results.statement" => results_statement(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, outcome))
}
