use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Distribution key for a demographic field left blank.
pub const UNSPECIFIED: &str = "Unspecified";

/// One of the three event days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Day(u8);

impl Day {
    pub const ALL: [Day; 3] = [Day(1), Day(2), Day(3)];

    pub fn new(value: i64) -> Option<Day> {
        match value {
            1..=3 => Some(Day(value as u8)),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Day {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Day::new(i64::from(value)).ok_or_else(|| format!("day {value} is not 1, 2 or 3"))
    }
}

impl From<Day> for u8 {
    fn from(day: Day) -> u8 {
        day.0
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Day {}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub sex: Option<String>,
    pub position: Option<String>,
    pub school: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comments {
    pub strengths: String,
    pub improvements: String,
}

/// A respondent's completed questionnaire after boundary coercion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submission {
    pub profile: Profile,
    pub selected_day: Option<Day>,
    pub general_ratings: BTreeMap<String, f64>,
    /// session id -> session question id -> rating
    pub session_ratings: BTreeMap<String, BTreeMap<String, f64>>,
    pub comments: Comments,
}

/// The flat, loosely-typed record exchanged with the submission store.
///
/// Ratings arrive as arbitrary JSON and the day may be a number, a string or
/// missing; `records::parse_record` turns this into a [`Submission`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub selected_day: Value,
    #[serde(default)]
    pub general_ratings: Value,
    #[serde(default)]
    pub session_ratings: Value,
    #[serde(default)]
    pub strengths: Option<String>,
    #[serde(default)]
    pub improvements: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RatingStat {
    pub sum: f64,
    pub count: u64,
    pub avg: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyRatings {
    pub overall: f64,
    pub pmt: f64,
    pub meals: f64,
    pub venue: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommentCollation {
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub total_respondents: u64,
    pub daily_respondents: BTreeMap<Day, u64>,
    pub overall_rating: f64,
    pub daily_ratings: BTreeMap<Day, DailyRatings>,
    pub sex_distribution: BTreeMap<String, u64>,
    pub position_distribution: BTreeMap<String, u64>,
    pub general_ratings: BTreeMap<String, RatingStat>,
    pub session_ratings: BTreeMap<String, BTreeMap<String, RatingStat>>,
    pub comments: CommentCollation,
}
