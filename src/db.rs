use crate::calc::{Attendance, Exam, OabcGrade, Student, StudentStatus, SubjectMark};
use crate::curriculum::{Curriculum, Grade, GradingSystem, SubjectDefinition};
use crate::policy::{self, CalcConfig};
use crate::terms::Term;
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

pub const DB_FILE_NAME: &str = "termresult.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            roll_no TEXT,
            grade TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            sort_order INTEGER NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_grade_sort ON students(grade, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS exams(
            student_id TEXT NOT NULL,
            exam_id TEXT NOT NULL,
            name TEXT NOT NULL,
            total_working_days INTEGER,
            days_present INTEGER,
            updated_at TEXT,
            PRIMARY KEY(student_id, exam_id),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subject_marks(
            student_id TEXT NOT NULL,
            exam_id TEXT NOT NULL,
            subject TEXT NOT NULL,
            marks REAL,
            exam_marks REAL,
            activity_marks REAL,
            grade TEXT,
            updated_at TEXT,
            PRIMARY KEY(student_id, exam_id, subject),
            FOREIGN KEY(student_id, exam_id) REFERENCES exams(student_id, exam_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS curriculum_subjects(
            grade TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            name TEXT NOT NULL,
            exam_full_marks REAL NOT NULL,
            activity_full_marks REAL NOT NULL,
            grading_system TEXT,
            PRIMARY KEY(grade, name)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

pub fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(text) => Ok(Some(
            serde_json::from_str(&text).with_context(|| format!("setting {} is not JSON", key))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

pub fn load_calc_config(conn: &Connection) -> anyhow::Result<CalcConfig> {
    let bands = settings_get_json(conn, policy::SETTINGS_KEY_BANDS)?;
    let law = settings_get_json(conn, policy::SETTINGS_KEY_RANKING_LAW)?;
    Ok(CalcConfig::from_settings(bands.as_ref(), law.as_ref()))
}

pub fn load_curriculum(conn: &Connection) -> anyhow::Result<Curriculum> {
    let mut stmt = conn.prepare(
        "SELECT grade, name, exam_full_marks, activity_full_marks, grading_system
         FROM curriculum_subjects
         ORDER BY grade, sort_order",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, f64>(2)?,
                r.get::<_, f64>(3)?,
                r.get::<_, Option<String>>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut curriculum = Curriculum::new();
    for (grade, name, exam_full_marks, activity_full_marks, grading_system) in rows {
        let Ok(grade) = grade.parse::<Grade>() else {
            tracing::warn!("skipping curriculum row with unknown grade {:?}", grade);
            continue;
        };
        let grading_system = GradingSystem::from_code(grading_system.as_deref())
            .unwrap_or_else(|e| {
                tracing::warn!("treating {} ({}) as numeric: {}", name, grade, e);
                GradingSystem::Numeric
            });
        curriculum.push_subject(
            grade,
            SubjectDefinition {
                name,
                exam_full_marks,
                activity_full_marks,
                grading_system,
            },
        );
    }
    Ok(curriculum)
}

pub fn load_grade_subjects(
    conn: &Connection,
    grade: Grade,
) -> anyhow::Result<Vec<SubjectDefinition>> {
    Ok(load_curriculum(conn)?.subjects(grade).to_vec())
}

pub fn replace_grade_subjects(
    conn: &Connection,
    grade: Grade,
    subjects: &[SubjectDefinition],
) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM curriculum_subjects WHERE grade = ?",
        [grade.as_str()],
    )?;
    for (i, s) in subjects.iter().enumerate() {
        tx.execute(
            "INSERT INTO curriculum_subjects(
               grade, sort_order, name, exam_full_marks, activity_full_marks, grading_system
             ) VALUES(?, ?, ?, ?, ?, ?)",
            (
                grade.as_str(),
                i as i64,
                &s.name,
                s.exam_full_marks,
                s.activity_full_marks,
                s.grading_system.code(),
            ),
        )?;
    }
    tx.commit()?;
    Ok(())
}

struct StudentRow {
    id: String,
    full_name: String,
    roll_no: Option<String>,
    grade: String,
    status: String,
}

fn student_from_row(row: StudentRow) -> Option<Student> {
    let grade = match row.grade.parse::<Grade>() {
        Ok(g) => g,
        Err(e) => {
            tracing::warn!("skipping student {}: {}", row.id, e);
            return None;
        }
    };
    let status = row.status.parse::<StudentStatus>().unwrap_or_else(|e| {
        tracing::warn!("student {} treated as inactive: {}", row.id, e);
        StudentStatus::Inactive
    });
    Some(Student {
        id: row.id,
        full_name: row.full_name,
        roll_no: row.roll_no,
        grade,
        status,
        academic_performance: Vec::new(),
    })
}

fn map_student_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<StudentRow> {
    Ok(StudentRow {
        id: r.get(0)?,
        full_name: r.get(1)?,
        roll_no: r.get(2)?,
        grade: r.get(3)?,
        status: r.get(4)?,
    })
}

/// Students of one grade with their exams, in roster order.
pub fn load_roster(conn: &Connection, grade: Grade) -> anyhow::Result<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name, roll_no, grade, status
         FROM students
         WHERE grade = ?
         ORDER BY sort_order, full_name",
    )?;
    let rows = stmt
        .query_map([grade.as_str()], map_student_row)?
        .collect::<Result<Vec<_>, _>>()?;
    let mut students: Vec<Student> = rows.into_iter().filter_map(student_from_row).collect();

    let mut exams = load_exams(
        conn,
        "SELECT e.student_id, e.exam_id, e.name, e.total_working_days, e.days_present
         FROM exams e
         JOIN students s ON s.id = e.student_id
         WHERE s.grade = ?
         ORDER BY e.exam_id",
        "SELECT m.student_id, m.exam_id, m.subject, m.marks, m.exam_marks, m.activity_marks, m.grade
         FROM subject_marks m
         JOIN students s ON s.id = m.student_id
         WHERE s.grade = ?
         ORDER BY m.rowid",
        grade.as_str(),
    )?;
    for s in &mut students {
        s.academic_performance = exams.remove(&s.id).unwrap_or_default();
    }
    Ok(students)
}

pub fn load_student(conn: &Connection, student_id: &str) -> anyhow::Result<Option<Student>> {
    let row = conn
        .query_row(
            "SELECT id, full_name, roll_no, grade, status FROM students WHERE id = ?",
            [student_id],
            map_student_row,
        )
        .optional()?;
    let Some(mut student) = row.and_then(student_from_row) else {
        return Ok(None);
    };
    let mut exams = load_exams(
        conn,
        "SELECT student_id, exam_id, name, total_working_days, days_present
         FROM exams
         WHERE student_id = ?
         ORDER BY exam_id",
        "SELECT student_id, exam_id, subject, marks, exam_marks, activity_marks, grade
         FROM subject_marks
         WHERE student_id = ?
         ORDER BY rowid",
        student_id,
    )?;
    student.academic_performance = exams.remove(student_id).unwrap_or_default();
    Ok(Some(student))
}

fn load_exams(
    conn: &Connection,
    exams_sql: &str,
    marks_sql: &str,
    key: &str,
) -> anyhow::Result<HashMap<String, Vec<Exam>>> {
    let mut out: HashMap<String, Vec<Exam>> = HashMap::new();

    let mut stmt = conn.prepare(exams_sql)?;
    let exam_rows = stmt
        .query_map([key], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, Option<i64>>(3)?,
                r.get::<_, Option<i64>>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (student_id, exam_id, name, total, present) in exam_rows {
        let attendance = match (total, present) {
            (Some(t), Some(p)) => Some(Attendance {
                total_working_days: t.max(0) as u32,
                days_present: p.max(0) as u32,
            }),
            _ => None,
        };
        let mut exam = Exam::empty(&exam_id, &name);
        exam.attendance = attendance;
        out.entry(student_id).or_default().push(exam);
    }

    let mut stmt = conn.prepare(marks_sql)?;
    let mark_rows = stmt
        .query_map([key], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                SubjectMark {
                    subject: r.get(2)?,
                    marks: r.get(3)?,
                    exam_marks: r.get(4)?,
                    activity_marks: r.get(5)?,
                    grade: r
                        .get::<_, Option<String>>(6)?
                        .and_then(|g| g.parse::<OabcGrade>().ok()),
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (student_id, exam_id, mark) in mark_rows {
        if let Some(exam) = out
            .get_mut(&student_id)
            .and_then(|exams| exams.iter_mut().find(|e| e.id == exam_id))
        {
            exam.results.push(mark);
        }
    }

    Ok(out)
}

/// Create the exam record for a term if the student has none yet.
pub fn ensure_exam(conn: &Connection, student_id: &str, term: Term) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO exams(student_id, exam_id, name, updated_at) VALUES(?, ?, ?, ?)",
        (student_id, term.id(), term.name(), now_stamp()),
    )?;
    Ok(())
}

pub fn upsert_subject_mark(
    conn: &Connection,
    student_id: &str,
    term: Term,
    mark: &SubjectMark,
) -> rusqlite::Result<()> {
    ensure_exam(conn, student_id, term)?;
    conn.execute(
        "INSERT INTO subject_marks(
           student_id, exam_id, subject, marks, exam_marks, activity_marks, grade, updated_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(student_id, exam_id, subject) DO UPDATE SET
           marks = excluded.marks,
           exam_marks = excluded.exam_marks,
           activity_marks = excluded.activity_marks,
           grade = excluded.grade,
           updated_at = excluded.updated_at",
        (
            student_id,
            term.id(),
            &mark.subject,
            mark.marks,
            mark.exam_marks,
            mark.activity_marks,
            mark.grade.map(OabcGrade::as_str),
            now_stamp(),
        ),
    )?;
    Ok(())
}
