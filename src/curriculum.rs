use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown grade: {0:?}")]
    Grade(String),
    #[error("unknown grading system: {0:?} (expected OABC or null)")]
    GradingSystem(String),
    #[error("unknown student status: {0:?}")]
    Status(String),
    #[error("unknown exam term: {0:?} (expected term1, term2 or term3)")]
    Term(String),
    #[error("grade must be one of O, A, B, C (got {0:?})")]
    OabcGrade(String),
}

/// School grade (class level). Determines curriculum and pass rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    Nursery,
    Kg,
    I,
    II,
    III,
    IV,
    V,
    VI,
    VII,
    VIII,
    IX,
    X,
}

impl Grade {
    pub const ALL: [Grade; 12] = [
        Grade::Nursery,
        Grade::Kg,
        Grade::I,
        Grade::II,
        Grade::III,
        Grade::IV,
        Grade::V,
        Grade::VI,
        Grade::VII,
        Grade::VIII,
        Grade::IX,
        Grade::X,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Nursery => "Nursery",
            Grade::Kg => "KG",
            Grade::I => "I",
            Grade::II => "II",
            Grade::III => "III",
            Grade::IV => "IV",
            Grade::V => "V",
            Grade::VI => "VI",
            Grade::VII => "VII",
            Grade::VIII => "VIII",
            Grade::IX => "IX",
            Grade::X => "X",
        }
    }

    pub fn band(self) -> GradeBand {
        match self {
            Grade::Nursery | Grade::Kg | Grade::I | Grade::II => GradeBand::Early,
            Grade::III | Grade::IV | Grade::V | Grade::VI | Grade::VII | Grade::VIII => {
                GradeBand::Middle
            }
            Grade::IX | Grade::X => GradeBand::Senior,
        }
    }
}

impl FromStr for Grade {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        Grade::ALL
            .iter()
            .copied()
            .find(|g| g.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| ParseError::Grade(s.to_string()))
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GradeBand {
    Early,
    Middle,
    Senior,
}

impl GradeBand {
    pub const ALL: [GradeBand; 3] = [GradeBand::Early, GradeBand::Middle, GradeBand::Senior];

    pub fn key(self) -> &'static str {
        match self {
            GradeBand::Early => "early",
            GradeBand::Middle => "middle",
            GradeBand::Senior => "senior",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradingSystem {
    #[default]
    Numeric,
    Oabc,
}

impl GradingSystem {
    pub fn is_numeric(&self) -> bool {
        *self == GradingSystem::Numeric
    }

    /// Storage form; `None` for numeric subjects.
    pub fn code(self) -> Option<&'static str> {
        match self {
            GradingSystem::Numeric => None,
            GradingSystem::Oabc => Some("OABC"),
        }
    }

    pub fn from_code(code: Option<&str>) -> Result<Self, ParseError> {
        match code.map(str::trim) {
            None | Some("") => Ok(GradingSystem::Numeric),
            Some(c) if c.eq_ignore_ascii_case("numeric") => Ok(GradingSystem::Numeric),
            Some(c) if c.eq_ignore_ascii_case("oabc") => Ok(GradingSystem::Oabc),
            Some(c) => Err(ParseError::GradingSystem(c.to_string())),
        }
    }
}

impl Serialize for GradingSystem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.code() {
            Some(c) => serializer.serialize_str(c),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for GradingSystem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        GradingSystem::from_code(raw.as_deref()).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDefinition {
    pub name: String,
    #[serde(default)]
    pub exam_full_marks: f64,
    #[serde(default)]
    pub activity_full_marks: f64,
    #[serde(default, skip_serializing_if = "GradingSystem::is_numeric")]
    pub grading_system: GradingSystem,
}

impl SubjectDefinition {
    pub fn numeric(name: &str, exam_full_marks: f64, activity_full_marks: f64) -> Self {
        Self {
            name: name.to_string(),
            exam_full_marks,
            activity_full_marks,
            grading_system: GradingSystem::Numeric,
        }
    }

    pub fn graded(name: &str) -> Self {
        Self {
            name: name.to_string(),
            exam_full_marks: 0.0,
            activity_full_marks: 0.0,
            grading_system: GradingSystem::Oabc,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.grading_system == GradingSystem::Oabc
    }
}

/// Subject lists per grade. Grades without an entry have no subjects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Curriculum {
    grades: BTreeMap<Grade, Vec<SubjectDefinition>>,
}

impl Curriculum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subjects(&self, grade: Grade) -> &[SubjectDefinition] {
        self.grades.get(&grade).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push_subject(&mut self, grade: Grade, subject: SubjectDefinition) {
        self.grades.entry(grade).or_default().push(subject);
    }
}
