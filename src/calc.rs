use crate::curriculum::{Curriculum, Grade, ParseError, SubjectDefinition};
use crate::policy::{CalcConfig, PolicyTable, RankingLaw};
use crate::subjects;
use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OabcGrade {
    O,
    A,
    B,
    C,
}

impl OabcGrade {
    pub fn as_str(self) -> &'static str {
        match self {
            OabcGrade::O => "O",
            OabcGrade::A => "A",
            OabcGrade::B => "B",
            OabcGrade::C => "C",
        }
    }
}

impl FromStr for OabcGrade {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "O" => Ok(OabcGrade::O),
            "A" => Ok(OabcGrade::A),
            "B" => Ok(OabcGrade::B),
            "C" => Ok(OabcGrade::C),
            _ => Err(ParseError::OabcGrade(s.to_string())),
        }
    }
}

/// One subject's recorded result in one exam.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMark {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_marks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_marks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<OabcGrade>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub total_working_days: u32,
    pub days_present: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub results: Vec<SubjectMark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Attendance>,
}

impl Exam {
    pub fn empty(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            results: Vec::new(),
            attendance: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentStatus {
    Active,
    Inactive,
    Graduated,
    Transferred,
}

impl StudentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StudentStatus::Active => "ACTIVE",
            StudentStatus::Inactive => "INACTIVE",
            StudentStatus::Graduated => "GRADUATED",
            StudentStatus::Transferred => "TRANSFERRED",
        }
    }
}

impl FromStr for StudentStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(StudentStatus::Active),
            "INACTIVE" => Ok(StudentStatus::Inactive),
            "GRADUATED" => Ok(StudentStatus::Graduated),
            "TRANSFERRED" => Ok(StudentStatus::Transferred),
            _ => Err(ParseError::Status(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_no: Option<String>,
    pub grade: Grade,
    pub status: StudentStatus,
    #[serde(default)]
    pub academic_performance: Vec<Exam>,
}

impl Student {
    pub fn exam(&self, exam_id: &str) -> Option<&Exam> {
        self.academic_performance.iter().find(|e| e.id == exam_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "SIMPLE PASS")]
    SimplePass,
    #[serde(rename = "FAIL")]
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Division {
    #[serde(rename = "Distinction")]
    Distinction,
    #[serde(rename = "I Div")]
    First,
    #[serde(rename = "II Div")]
    Second,
    #[serde(rename = "III Div")]
    Third,
    #[serde(rename = "-")]
    NotAwarded,
}

impl Division {
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= 75.0 {
            Division::Distinction
        } else if percentage >= 60.0 {
            Division::First
        } else if percentage >= 45.0 {
            Division::Second
        } else if percentage >= 35.0 {
            Division::Third
        } else {
            Division::NotAwarded
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcademicGrade {
    O,
    A,
    B,
    C,
    D,
    E,
}

impl AcademicGrade {
    pub fn for_result(result: ResultStatus, percentage: f64) -> Self {
        if result == ResultStatus::Fail {
            AcademicGrade::E
        } else if percentage > 89.0 {
            AcademicGrade::O
        } else if percentage > 79.0 {
            AcademicGrade::A
        } else if percentage > 69.0 {
            AcademicGrade::B
        } else if percentage > 59.0 {
            AcademicGrade::C
        } else {
            AcademicGrade::D
        }
    }
}

/// Class position; serialized as a number, or `"-"` when unranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Position(u32),
    Unranked,
}

impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rank::Position(n) => serializer.serialize_u32(*n),
            Rank::Unranked => serializer.serialize_str("-"),
        }
    }
}

/// Report-card line for one curriculum subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectLine {
    pub subject: String,
    pub graded: bool,
    pub exam_marks: f64,
    pub activity_marks: f64,
    pub total: f64,
    pub full_marks: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<OabcGrade>,
    pub passed: bool,
}

/// One student's aggregate for one exam term, before ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermResult {
    pub grand_total: f64,
    pub exam_total: f64,
    pub activity_total: f64,
    pub full_marks_total: f64,
    pub percentage: f64,
    pub result: ResultStatus,
    pub division: Division,
    pub academic_grade: AcademicGrade,
    pub remark: String,
    pub failed_subjects: Vec<String>,
    pub subjects: Vec<SubjectLine>,
}

pub fn remark(result: ResultStatus, percentage: f64, failed_subjects: &[String]) -> String {
    match result {
        ResultStatus::Fail => {
            if failed_subjects.is_empty() {
                "Needs significant improvement.".to_string()
            } else {
                format!(
                    "Needs significant improvement in {}.",
                    failed_subjects.join(", ")
                )
            }
        }
        ResultStatus::SimplePass => format!(
            "Simple Pass. Focus on improving in {}.",
            failed_subjects.join(", ")
        ),
        ResultStatus::Pass => {
            let text = if percentage >= 90.0 {
                "Outstanding performance!"
            } else if percentage >= 75.0 {
                "Excellent performance."
            } else if percentage >= 60.0 {
                "Good performance."
            } else if percentage >= 45.0 {
                "Satisfactory performance."
            } else {
                "Passed, needs improvement."
            };
            text.to_string()
        }
    }
}

/// Aggregate one student's marks for one term. A missing exam counts as
/// all-zero marks.
pub fn aggregate(
    grade: Grade,
    exam: Option<&Exam>,
    subjects: &[SubjectDefinition],
    policies: &PolicyTable,
) -> TermResult {
    let policy = policies.policy_for(grade);
    let recorded: &[SubjectMark] = exam.map(|e| e.results.as_slice()).unwrap_or(&[]);

    let mut grand_total = 0.0_f64;
    let mut exam_total = 0.0_f64;
    let mut activity_total = 0.0_f64;
    let mut full_marks_total = 0.0_f64;
    let mut failed_subjects: Vec<String> = Vec::new();
    let mut unpassed_graded = 0_usize;
    let mut lines: Vec<SubjectLine> = Vec::with_capacity(subjects.len());

    for def in subjects {
        let mark = subjects::find_mark(recorded, &def.name);

        if def.is_graded() {
            let grade = mark.and_then(|m| m.grade);
            if grade.is_none() {
                unpassed_graded += 1;
            }
            lines.push(SubjectLine {
                subject: def.name.clone(),
                graded: true,
                exam_marks: 0.0,
                activity_marks: 0.0,
                total: 0.0,
                full_marks: 0.0,
                grade,
                passed: grade.is_some(),
            });
            continue;
        }

        let (summative, activity, full_marks) = if policy.has_activities {
            (
                mark.and_then(|m| m.exam_marks).unwrap_or(0.0),
                mark.and_then(|m| m.activity_marks).unwrap_or(0.0),
                def.exam_full_marks + def.activity_full_marks,
            )
        } else {
            (
                mark.and_then(|m| m.marks.or(m.exam_marks)).unwrap_or(0.0),
                0.0,
                def.exam_full_marks,
            )
        };
        let total = summative + activity;

        grand_total += total;
        exam_total += summative;
        activity_total += activity;
        full_marks_total += full_marks;

        let passed = summative >= policy.pass_mark;
        if !passed {
            failed_subjects.push(def.name.clone());
        }
        lines.push(SubjectLine {
            subject: def.name.clone(),
            graded: false,
            exam_marks: summative,
            activity_marks: activity,
            total,
            full_marks,
            grade: None,
            passed,
        });
    }

    let percentage = if full_marks_total > 0.0 {
        grand_total / full_marks_total * 100.0
    } else {
        0.0
    };

    let failed = failed_subjects.len();
    let result = if unpassed_graded > 0 {
        ResultStatus::Fail
    } else if failed == 0 {
        ResultStatus::Pass
    } else if failed == 1 && policy.simple_pass_allowed {
        ResultStatus::SimplePass
    } else {
        ResultStatus::Fail
    };

    let division = if policy.awards_division && result == ResultStatus::Pass {
        Division::for_percentage(percentage)
    } else {
        Division::NotAwarded
    };

    TermResult {
        grand_total,
        exam_total,
        activity_total,
        full_marks_total,
        percentage,
        result,
        division,
        academic_grade: AcademicGrade::for_result(result, percentage),
        remark: remark(result, percentage, &failed_subjects),
        failed_subjects,
        subjects: lines,
    }
}

/// Rank passing students. `None` entries (not eligible for this class list)
/// and non-PASS results are unranked. Output order follows input order.
pub fn assign_ranks<'a, I>(entries: I, law: RankingLaw) -> Vec<Rank>
where
    I: IntoIterator<Item = Option<&'a TermResult>>,
{
    let entries: Vec<Option<&TermResult>> = entries.into_iter().collect();
    let mut ladder: Vec<f64> = entries
        .iter()
        .flatten()
        .filter(|r| r.result == ResultStatus::Pass)
        .map(|r| r.grand_total)
        .collect();
    ladder.sort_by(|a, b| b.total_cmp(a));
    if law == RankingLaw::DistinctTotals {
        ladder.dedup();
    }

    entries
        .iter()
        .map(|entry| match entry {
            Some(r) if r.result == ResultStatus::Pass => ladder
                .iter()
                .position(|t| *t == r.grand_total)
                .map(|i| Rank::Position(i as u32 + 1))
                .unwrap_or(Rank::Unranked),
            _ => Rank::Unranked,
        })
        .collect()
}

/// A student's term result with class rank, as every report view shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResult {
    pub student_id: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_no: Option<String>,
    pub status: StudentStatus,
    pub has_exam: bool,
    #[serde(flatten)]
    pub summary: TermResult,
    pub rank: Rank,
}

/// Compute every roster student's result for `exam_id` and rank the active
/// students of `grade` who sat the exam against each other.
pub fn compute_class_results(
    roster: &[Student],
    grade: Grade,
    exam_id: &str,
    curriculum: &Curriculum,
    config: &CalcConfig,
) -> Vec<StudentResult> {
    let summaries: Vec<TermResult> = roster
        .iter()
        .map(|s| {
            aggregate(
                s.grade,
                s.exam(exam_id),
                curriculum.subjects(s.grade),
                &config.policies,
            )
        })
        .collect();

    let ranks = assign_ranks(
        roster.iter().zip(&summaries).map(|(s, r)| {
            let eligible = s.status == StudentStatus::Active
                && s.grade == grade
                && s.exam(exam_id).is_some();
            eligible.then_some(r)
        }),
        config.ranking_law,
    );

    roster
        .iter()
        .zip(summaries)
        .zip(ranks)
        .map(|((s, summary), rank)| StudentResult {
            student_id: s.id.clone(),
            full_name: s.full_name.clone(),
            roll_no: s.roll_no.clone(),
            status: s.status,
            has_exam: s.exam(exam_id).is_some(),
            summary,
            rank,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn middle_subjects(names: &[&str]) -> Vec<SubjectDefinition> {
        names
            .iter()
            .map(|n| SubjectDefinition::numeric(n, 60.0, 40.0))
            .collect()
    }

    fn exam_marks(name: &str, exam: f64, activity: f64) -> SubjectMark {
        SubjectMark {
            subject: name.to_string(),
            exam_marks: Some(exam),
            activity_marks: Some(activity),
            ..SubjectMark::default()
        }
    }

    fn plain_marks(name: &str, marks: f64) -> SubjectMark {
        SubjectMark {
            subject: name.to_string(),
            marks: Some(marks),
            ..SubjectMark::default()
        }
    }

    fn graded(name: &str, grade: Option<OabcGrade>) -> SubjectMark {
        SubjectMark {
            subject: name.to_string(),
            grade,
            ..SubjectMark::default()
        }
    }

    fn exam_with(results: Vec<SubjectMark>) -> Exam {
        Exam {
            results,
            ..Exam::empty("term1", "First Terminal Examination")
        }
    }

    /// Two senior subjects scored alike, so the percentage equals `score`.
    fn senior_result(score: f64) -> TermResult {
        let defs = vec![
            SubjectDefinition::numeric("Science", 100.0, 0.0),
            SubjectDefinition::numeric("Math", 100.0, 0.0),
        ];
        let exam = exam_with(vec![plain_marks("Science", score), plain_marks("Math", score)]);
        aggregate(Grade::X, Some(&exam), &defs, &PolicyTable::default())
    }

    fn student(id: &str, grade: Grade, status: StudentStatus, exams: Vec<Exam>) -> Student {
        Student {
            id: id.to_string(),
            full_name: format!("Student {}", id),
            roll_no: None,
            grade,
            status,
            academic_performance: exams,
        }
    }

    #[test]
    fn aggregation_is_idempotent() {
        let defs = middle_subjects(&["English", "Math"]);
        let exam = exam_with(vec![
            exam_marks("English", 45.0, 30.0),
            exam_marks("Math", 50.0, 35.0),
        ]);
        let policies = PolicyTable::default();
        let a = aggregate(Grade::IV, Some(&exam), &defs, &policies);
        let b = aggregate(Grade::IV, Some(&exam), &defs, &policies);
        assert_eq!(a, b);
        assert_eq!(a.grand_total, 160.0);
        assert_eq!(a.exam_total, 95.0);
        assert_eq!(a.activity_total, 65.0);
        assert_eq!(a.full_marks_total, 200.0);
        assert_eq!(a.percentage, 80.0);
        assert_eq!(a.academic_grade, AcademicGrade::A);
        assert_eq!(a.remark, "Excellent performance.");
    }

    #[test]
    fn middle_band_threshold_is_strict() {
        let defs = middle_subjects(&["Science"]);
        let policies = PolicyTable::default();

        let at = exam_with(vec![exam_marks("Science", 20.0, 0.0)]);
        let r = aggregate(Grade::VI, Some(&at), &defs, &policies);
        assert!(r.failed_subjects.is_empty());
        assert_eq!(r.result, ResultStatus::Pass);

        let below = exam_with(vec![exam_marks("Science", 19.0, 40.0)]);
        let r = aggregate(Grade::VI, Some(&below), &defs, &policies);
        assert_eq!(r.failed_subjects, vec!["Science".to_string()]);
    }

    #[test]
    fn activity_marks_do_not_rescue_summative_failure() {
        let defs = middle_subjects(&["Science", "Math"]);
        let exam = exam_with(vec![
            exam_marks("Science", 10.0, 40.0),
            exam_marks("Math", 55.0, 40.0),
        ]);
        let r = aggregate(Grade::VII, Some(&exam), &defs, &PolicyTable::default());
        assert_eq!(r.result, ResultStatus::SimplePass);
        assert_eq!(r.grand_total, 145.0);
    }

    #[test]
    fn one_failure_is_simple_pass_two_is_fail() {
        let defs = middle_subjects(&["English", "Math", "Science"]);
        let policies = PolicyTable::default();

        let one = exam_with(vec![
            exam_marks("English", 10.0, 30.0),
            exam_marks("Math", 50.0, 30.0),
            exam_marks("Science", 50.0, 30.0),
        ]);
        let r = aggregate(Grade::V, Some(&one), &defs, &policies);
        assert_eq!(r.result, ResultStatus::SimplePass);
        assert_eq!(r.remark, "Simple Pass. Focus on improving in English.");
        assert_ne!(r.academic_grade, AcademicGrade::E);

        let two = exam_with(vec![
            exam_marks("English", 10.0, 30.0),
            exam_marks("Math", 5.0, 30.0),
            exam_marks("Science", 50.0, 30.0),
        ]);
        let r = aggregate(Grade::V, Some(&two), &defs, &policies);
        assert_eq!(r.result, ResultStatus::Fail);
        assert_eq!(r.academic_grade, AcademicGrade::E);
        assert_eq!(
            r.remark,
            "Needs significant improvement in English, Math."
        );
    }

    #[test]
    fn senior_band_allows_simple_pass_and_ignores_activity_full_marks() {
        let defs = vec![
            SubjectDefinition::numeric("English", 100.0, 25.0),
            SubjectDefinition::numeric("Science", 100.0, 25.0),
        ];
        let exam = exam_with(vec![plain_marks("English", 80.0), plain_marks("Science", 32.0)]);
        let r = aggregate(Grade::IX, Some(&exam), &defs, &PolicyTable::default());
        assert_eq!(r.full_marks_total, 200.0);
        assert_eq!(r.result, ResultStatus::SimplePass);
        assert_eq!(r.division, Division::NotAwarded);
        assert_eq!(r.failed_subjects, vec!["Science".to_string()]);
    }

    #[test]
    fn early_band_has_no_simple_pass() {
        let defs = vec![
            SubjectDefinition::numeric("English", 100.0, 0.0),
            SubjectDefinition::numeric("Math", 100.0, 0.0),
        ];
        let exam = exam_with(vec![plain_marks("English", 90.0), plain_marks("Math", 34.0)]);
        let r = aggregate(Grade::I, Some(&exam), &defs, &PolicyTable::default());
        assert_eq!(r.result, ResultStatus::Fail);
        assert_eq!(r.failed_subjects, vec!["Math".to_string()]);

        let exam = exam_with(vec![plain_marks("English", 90.0), plain_marks("Math", 35.0)]);
        let r = aggregate(Grade::I, Some(&exam), &defs, &PolicyTable::default());
        assert_eq!(r.result, ResultStatus::Pass);
    }

    #[test]
    fn ungraded_oabc_subject_forces_fail() {
        let mut defs = middle_subjects(&["English", "Math"]);
        defs.push(SubjectDefinition::graded("Drawing"));
        let policies = PolicyTable::default();

        let missing = exam_with(vec![
            exam_marks("English", 55.0, 35.0),
            exam_marks("Math", 55.0, 35.0),
        ]);
        let r = aggregate(Grade::III, Some(&missing), &defs, &policies);
        assert_eq!(r.result, ResultStatus::Fail);
        assert!(r.failed_subjects.is_empty());
        assert_eq!(r.remark, "Needs significant improvement.");
        assert_eq!(r.full_marks_total, 200.0);

        let blank = exam_with(vec![
            exam_marks("English", 55.0, 35.0),
            exam_marks("Math", 55.0, 35.0),
            graded("Drawing", None),
        ]);
        let r = aggregate(Grade::III, Some(&blank), &defs, &policies);
        assert_eq!(r.result, ResultStatus::Fail);

        let graded_ok = exam_with(vec![
            exam_marks("English", 55.0, 35.0),
            exam_marks("Math", 55.0, 35.0),
            graded("Drawing", Some(OabcGrade::B)),
        ]);
        let r = aggregate(Grade::III, Some(&graded_ok), &defs, &policies);
        assert_eq!(r.result, ResultStatus::Pass);
    }

    #[test]
    fn oabc_failure_overrides_simple_pass() {
        let mut defs = middle_subjects(&["English", "Math"]);
        defs.push(SubjectDefinition::graded("Drawing"));
        let exam = exam_with(vec![
            exam_marks("English", 5.0, 35.0),
            exam_marks("Math", 55.0, 35.0),
        ]);
        let r = aggregate(Grade::III, Some(&exam), &defs, &PolicyTable::default());
        assert_eq!(r.result, ResultStatus::Fail);
        assert_eq!(
            r.remark,
            "Needs significant improvement in English."
        );
    }

    #[test]
    fn empty_curriculum_yields_zero_percentage() {
        let r = aggregate(Grade::V, None, &[], &PolicyTable::default());
        assert_eq!(r.percentage, 0.0);
        assert!(r.percentage.is_finite());
        assert_eq!(r.full_marks_total, 0.0);
    }

    #[test]
    fn missing_exam_counts_as_zero() {
        let defs = middle_subjects(&["English", "Math"]);
        let r = aggregate(Grade::V, None, &defs, &PolicyTable::default());
        assert_eq!(r.grand_total, 0.0);
        assert_eq!(r.result, ResultStatus::Fail);
        assert_eq!(r.failed_subjects.len(), 2);
    }

    #[test]
    fn aliased_subject_contributes_marks() {
        let defs = vec![
            SubjectDefinition::numeric("Social Studies", 60.0, 40.0),
            SubjectDefinition::numeric("Mathematics", 60.0, 40.0),
        ];
        let exam = exam_with(vec![
            exam_marks("Social Science", 50.0, 30.0),
            exam_marks("Math", 40.0, 20.0),
        ]);
        let r = aggregate(Grade::VIII, Some(&exam), &defs, &PolicyTable::default());
        assert_eq!(r.grand_total, 140.0);
        assert_eq!(r.result, ResultStatus::Pass);
        assert_eq!(r.subjects[0].subject, "Social Studies");
        assert_eq!(r.subjects[0].total, 80.0);
    }

    #[test]
    fn grade_three_scenario_is_simple_pass() {
        let names = ["English", "Nepali", "Math", "Science", "Social Studies", "Computer"];
        let defs = middle_subjects(&names);
        let exam = exam_with(
            names
                .iter()
                .map(|n| {
                    if *n == "Science" {
                        exam_marks(n, 15.0, 35.0)
                    } else {
                        exam_marks(n, 55.0, 38.0)
                    }
                })
                .collect(),
        );
        let r = aggregate(Grade::III, Some(&exam), &defs, &PolicyTable::default());
        assert_eq!(r.result, ResultStatus::SimplePass);
        assert_eq!(r.failed_subjects, vec!["Science".to_string()]);
        assert_eq!(r.division, Division::NotAwarded);
    }

    #[test]
    fn division_and_grade_tiers() {
        assert_eq!(senior_result(75.0).division, Division::Distinction);
        assert_eq!(senior_result(74.0).division, Division::First);
        assert_eq!(senior_result(60.0).division, Division::First);
        assert_eq!(senior_result(45.0).division, Division::Second);
        assert_eq!(senior_result(35.0).division, Division::Third);
        assert_eq!(senior_result(34.0).division, Division::NotAwarded);
        assert_eq!(senior_result(20.0).division, Division::NotAwarded);

        assert_eq!(senior_result(90.0).academic_grade, AcademicGrade::O);
        assert_eq!(senior_result(89.0).academic_grade, AcademicGrade::A);
        assert_eq!(senior_result(79.0).academic_grade, AcademicGrade::B);
        assert_eq!(senior_result(69.0).academic_grade, AcademicGrade::C);
        assert_eq!(senior_result(59.0).academic_grade, AcademicGrade::D);
        assert_eq!(senior_result(20.0).result, ResultStatus::Fail);
        assert_eq!(senior_result(20.0).academic_grade, AcademicGrade::E);
    }

    #[test]
    fn senior_band_two_failures_is_fail() {
        let defs = vec![
            SubjectDefinition::numeric("English", 100.0, 0.0),
            SubjectDefinition::numeric("Science", 100.0, 0.0),
            SubjectDefinition::numeric("Math", 100.0, 0.0),
        ];
        let policies = PolicyTable::default();

        let two = exam_with(vec![
            plain_marks("Math", 32.9),
            plain_marks("English", 90.0),
            plain_marks("Science", 32.0),
        ]);
        let r = aggregate(Grade::X, Some(&two), &defs, &policies);
        assert_eq!(r.result, ResultStatus::Fail);
        assert_eq!(
            r.failed_subjects,
            vec!["Science".to_string(), "Math".to_string()]
        );
        assert_eq!(r.remark, "Needs significant improvement in Science, Math.");
        assert_eq!(r.academic_grade, AcademicGrade::E);
        assert_eq!(r.division, Division::NotAwarded);

        let one = exam_with(vec![
            plain_marks("English", 90.0),
            plain_marks("Science", 32.0),
            plain_marks("Math", 33.0),
        ]);
        let r = aggregate(Grade::X, Some(&one), &defs, &policies);
        assert_eq!(r.result, ResultStatus::SimplePass);
        assert_eq!(r.failed_subjects, vec!["Science".to_string()]);
    }

    #[test]
    fn pass_remarks_follow_percentage_tiers() {
        assert_eq!(senior_result(90.0).remark, "Outstanding performance!");
        assert_eq!(senior_result(75.0).remark, "Excellent performance.");
        assert_eq!(senior_result(60.0).remark, "Good performance.");
        assert_eq!(senior_result(45.0).remark, "Satisfactory performance.");
        assert_eq!(senior_result(40.0).remark, "Passed, needs improvement.");
    }

    #[test]
    fn ranks_share_positions_for_equal_totals() {
        let results: Vec<TermResult> = [90.0, 85.0, 85.0, 70.0]
            .iter()
            .map(|t| senior_result(*t))
            .collect();
        let ranks = assign_ranks(results.iter().map(Some), RankingLaw::DistinctTotals);
        assert_eq!(
            ranks,
            vec![
                Rank::Position(1),
                Rank::Position(2),
                Rank::Position(2),
                Rank::Position(3)
            ]
        );

        let ranks = assign_ranks(results.iter().map(Some), RankingLaw::Competition);
        assert_eq!(
            ranks,
            vec![
                Rank::Position(1),
                Rank::Position(2),
                Rank::Position(2),
                Rank::Position(4)
            ]
        );
    }

    #[test]
    fn non_pass_results_are_never_ranked() {
        let top_fail = {
            let mut defs = vec![SubjectDefinition::numeric("Science", 100.0, 0.0)];
            defs.push(SubjectDefinition::graded("Drawing"));
            let exam = exam_with(vec![plain_marks("Science", 99.0)]);
            aggregate(Grade::X, Some(&exam), &defs, &PolicyTable::default())
        };
        assert_eq!(top_fail.result, ResultStatus::Fail);
        let pass = senior_result(50.0);
        let ranks = assign_ranks(vec![Some(&top_fail), Some(&pass), None], RankingLaw::default());
        assert_eq!(ranks, vec![Rank::Unranked, Rank::Position(1), Rank::Unranked]);
    }

    #[test]
    fn rank_serializes_as_number_or_dash() {
        assert_eq!(serde_json::to_value(Rank::Position(3)).unwrap(), 3);
        assert_eq!(serde_json::to_value(Rank::Unranked).unwrap(), "-");
        assert_eq!(
            serde_json::to_value(ResultStatus::SimplePass).unwrap(),
            "SIMPLE PASS"
        );
        assert_eq!(serde_json::to_value(Division::First).unwrap(), "I Div");
    }

    #[test]
    fn class_ranking_only_counts_active_students_who_sat_the_exam() {
        let mut curriculum = Curriculum::new();
        curriculum.push_subject(Grade::X, SubjectDefinition::numeric("Science", 100.0, 0.0));
        curriculum.push_subject(Grade::X, SubjectDefinition::numeric("Math", 100.0, 0.0));
        let sat = |m: f64| {
            vec![exam_with(vec![
                plain_marks("Science", m),
                plain_marks("Math", m),
            ])]
        };
        let roster = vec![
            student("a", Grade::X, StudentStatus::Active, sat(70.0)),
            student("b", Grade::X, StudentStatus::Inactive, sat(95.0)),
            student("c", Grade::X, StudentStatus::Active, sat(80.0)),
            student("d", Grade::X, StudentStatus::Active, Vec::new()),
            student("e", Grade::X, StudentStatus::Active, sat(20.0)),
        ];
        let out = compute_class_results(
            &roster,
            Grade::X,
            "term1",
            &curriculum,
            &CalcConfig::default(),
        );
        let ranks: Vec<Rank> = out.iter().map(|r| r.rank).collect();
        assert_eq!(
            ranks,
            vec![
                Rank::Position(2),
                Rank::Unranked,
                Rank::Position(1),
                Rank::Unranked,
                Rank::Unranked
            ]
        );
        assert!(!out[3].has_exam);
        assert_eq!(out[3].summary.result, ResultStatus::Fail);
        assert_eq!(out[4].summary.result, ResultStatus::Fail);
        assert_eq!(out[1].summary.result, ResultStatus::Pass);
    }
}
