use crate::curriculum::{Grade, GradeBand};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Pass/fail rules for one grade band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandPolicy {
    /// Subjects carry continuous-assessment marks next to the summative exam.
    pub has_activities: bool,
    /// A subject fails when its summative marks are strictly below this.
    pub pass_mark: f64,
    /// Exactly one failed subject yields SIMPLE PASS instead of FAIL.
    pub simple_pass_allowed: bool,
    pub awards_division: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTable {
    pub early: BandPolicy,
    pub middle: BandPolicy,
    pub senior: BandPolicy,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            early: BandPolicy {
                has_activities: false,
                pass_mark: 35.0,
                simple_pass_allowed: false,
                awards_division: false,
            },
            middle: BandPolicy {
                has_activities: true,
                pass_mark: 20.0,
                simple_pass_allowed: true,
                awards_division: false,
            },
            senior: BandPolicy {
                has_activities: false,
                pass_mark: 33.0,
                simple_pass_allowed: true,
                awards_division: true,
            },
        }
    }
}

impl PolicyTable {
    pub fn band(&self, band: GradeBand) -> &BandPolicy {
        match band {
            GradeBand::Early => &self.early,
            GradeBand::Middle => &self.middle,
            GradeBand::Senior => &self.senior,
        }
    }

    fn band_mut(&mut self, band: GradeBand) -> &mut BandPolicy {
        match band {
            GradeBand::Early => &mut self.early,
            GradeBand::Middle => &mut self.middle,
            GradeBand::Senior => &mut self.senior,
        }
    }

    pub fn policy_for(&self, grade: Grade) -> &BandPolicy {
        self.band(grade.band())
    }

    /// Merge a partial `{ early: {...}, middle: {...}, senior: {...} }` object.
    /// Nothing is applied when any field is invalid.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<(), String> {
        let mut next = *self;
        for (band_key, band_patch) in patch {
            let Some(band) = GradeBand::ALL
                .iter()
                .copied()
                .find(|b| b.key() == band_key.as_str())
            else {
                return Err(format!("unknown band: {}", band_key));
            };
            let Some(fields) = band_patch.as_object() else {
                return Err(format!("{} must be an object", band_key));
            };
            let policy = next.band_mut(band);
            for (k, v) in fields {
                match k.as_str() {
                    "hasActivities" => policy.has_activities = parse_bool(v, band_key, k)?,
                    "passMark" => {
                        let Some(n) = v.as_f64() else {
                            return Err(format!("{}.{} must be a number", band_key, k));
                        };
                        if !(0.0..=1000.0).contains(&n) {
                            return Err(format!("{}.{} must be between 0 and 1000", band_key, k));
                        }
                        policy.pass_mark = n;
                    }
                    "simplePassAllowed" => {
                        policy.simple_pass_allowed = parse_bool(v, band_key, k)?
                    }
                    "awardsDivision" => policy.awards_division = parse_bool(v, band_key, k)?,
                    _ => return Err(format!("unknown {} field: {}", band_key, k)),
                }
            }
        }
        *self = next;
        Ok(())
    }
}

fn parse_bool(v: &Value, band: &str, field: &str) -> Result<bool, String> {
    v.as_bool()
        .ok_or_else(|| format!("{}.{} must be a boolean", band, field))
}

/// How tied and lower totals are numbered among passing students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RankingLaw {
    /// 1 + index among distinct totals: 90, 85, 85, 70 -> 1, 2, 2, 3.
    #[default]
    DistinctTotals,
    /// 1 + number of strictly higher totals: 90, 85, 85, 70 -> 1, 2, 2, 4.
    Competition,
}

impl RankingLaw {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "distinctTotals" => Some(RankingLaw::DistinctTotals),
            "competition" => Some(RankingLaw::Competition),
            _ => None,
        }
    }
}

pub const SETTINGS_KEY_BANDS: &str = "policy.bands";
pub const SETTINGS_KEY_RANKING_LAW: &str = "policy.rankingLaw";

/// Everything the calculator needs beyond roster and curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalcConfig {
    pub policies: PolicyTable,
    pub ranking_law: RankingLaw,
}

impl CalcConfig {
    /// Build from saved settings values, falling back to defaults for anything
    /// missing or malformed.
    pub fn from_settings(bands: Option<&Value>, ranking_law: Option<&Value>) -> Self {
        let mut cfg = CalcConfig::default();
        if let Some(obj) = bands.and_then(|v| v.as_object()) {
            if let Err(e) = cfg.policies.apply_patch(obj) {
                tracing::warn!("ignoring saved band policy: {}", e);
            }
        }
        if let Some(law) = ranking_law.and_then(|v| v.as_str()) {
            match RankingLaw::parse(law) {
                Some(l) => cfg.ranking_law = l,
                None => tracing::warn!("ignoring saved ranking law: {}", law),
            }
        }
        cfg
    }
}
