//! Coercion of loosely-typed store records into [`Submission`]s.
//!
//! Nothing here rejects a record. A field that cannot be understood is
//! dropped on its own and the rest of the record is kept.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{Comments, Day, Profile, Submission, SubmissionRecord};

/// A finite number, or a string holding one.
pub fn coerce_rating(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Day 1, 2 or 3 from a number or a numeric string.
pub fn normalize_day(value: &Value) -> Option<Day> {
    coerce_integer(value).and_then(Day::new)
}

/// Integer form of a stored day, kept even when it is not an event day.
pub fn day_column(value: &Value) -> Option<i32> {
    coerce_integer(value).and_then(|d| i32::try_from(d).ok())
}

fn clean(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

fn parse_ratings(value: &Value, skipped: &mut usize) -> BTreeMap<String, f64> {
    let mut ratings = BTreeMap::new();
    let entries = match value {
        Value::Object(entries) => entries,
        Value::Null => return ratings,
        _ => {
            *skipped += 1;
            return ratings;
        }
    };
    for (id, raw) in entries {
        match coerce_rating(raw) {
            Some(rating) => {
                ratings.insert(id.clone(), rating);
            }
            None => *skipped += 1,
        }
    }
    ratings
}

pub fn parse_record(record: SubmissionRecord) -> Submission {
    let mut skipped = 0usize;

    let selected_day = normalize_day(&record.selected_day);
    if selected_day.is_none() && !record.selected_day.is_null() {
        debug!(
            "record {:?}: unrecognized day {}",
            record.id, record.selected_day
        );
    }

    let general_ratings = parse_ratings(&record.general_ratings, &mut skipped);

    let mut session_ratings = BTreeMap::new();
    match &record.session_ratings {
        Value::Object(sessions) => {
            for (session_id, answers) in sessions {
                if answers.is_object() {
                    session_ratings.insert(session_id.clone(), parse_ratings(answers, &mut skipped));
                } else if !answers.is_null() {
                    skipped += 1;
                }
            }
        }
        Value::Null => {}
        _ => skipped += 1,
    }

    if skipped > 0 {
        debug!(
            "record {:?}: skipped {} unreadable rating fields",
            record.id, skipped
        );
    }

    Submission {
        profile: Profile {
            name: record.name.unwrap_or_default(),
            email: record.email.unwrap_or_default(),
            sex: clean(record.sex),
            position: clean(record.position),
            school: record.school.unwrap_or_default(),
        },
        selected_day,
        general_ratings,
        session_ratings,
        comments: Comments {
            strengths: record.strengths.unwrap_or_default(),
            improvements: record.improvements.unwrap_or_default(),
        },
    }
}

fn ratings_value(ratings: &BTreeMap<String, f64>) -> Value {
    let entries: Map<String, Value> = ratings
        .iter()
        .map(|(id, rating)| (id.clone(), Value::from(*rating)))
        .collect();
    Value::Object(entries)
}

impl From<&Submission> for SubmissionRecord {
    fn from(submission: &Submission) -> Self {
        let sessions: Map<String, Value> = submission
            .session_ratings
            .iter()
            .map(|(id, answers)| (id.clone(), ratings_value(answers)))
            .collect();
        let profile = &submission.profile;

        SubmissionRecord {
            id: None,
            name: Some(profile.name.clone()),
            email: Some(profile.email.clone()),
            sex: Some(profile.sex.clone().unwrap_or_default()),
            position: Some(profile.position.clone().unwrap_or_default()),
            school: Some(profile.school.clone()),
            selected_day: submission
                .selected_day
                .map(|d| Value::from(d.number()))
                .unwrap_or(Value::Null),
            general_ratings: ratings_value(&submission.general_ratings),
            session_ratings: Value::Object(sessions),
            strengths: Some(submission.comments.strengths.clone()),
            improvements: Some(submission.comments.improvements.clone()),
            submitted_at: None,
        }
    }
}
