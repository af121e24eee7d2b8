//! Completion rules for a submission entered through the CLI.
//!
//! The aggregator never calls these. Stored records are aggregated on a
//! best-effort basis whether they would pass or not.

use thiserror::Error;

use crate::catalog::QuestionCatalog;
use crate::labels::RatingLabel;
use crate::models::Submission;

const SEX_OPTIONS: [&str; 2] = ["Male", "Female"];

#[derive(Debug, Error)]
#[error("submission is incomplete: {}", problems.join("; "))]
pub struct ValidationError {
    pub problems: Vec<String>,
}

fn is_scale_answer(rating: f64) -> bool {
    rating.fract() == 0.0
        && (0.0..=255.0).contains(&rating)
        && RatingLabel::from_score(rating as u8).is_some()
}

pub fn validate_submission(
    submission: &Submission,
    catalog: &QuestionCatalog,
) -> Result<(), ValidationError> {
    let mut problems = Vec::new();
    let profile = &submission.profile;

    if profile.email.trim().is_empty() {
        problems.push("email is required".to_string());
    }
    if profile.school.trim().is_empty() {
        problems.push("school/office is required".to_string());
    }
    match profile.sex.as_deref() {
        Some(sex) if SEX_OPTIONS.contains(&sex) => {}
        Some(sex) => problems.push(format!("sex must be Male or Female, got {sex:?}")),
        None => problems.push("sex is required".to_string()),
    }
    match profile.position.as_deref() {
        Some(position)
            if catalog.positions.is_empty() || catalog.positions.iter().any(|p| p == position) => {}
        Some(position) => problems.push(format!("unknown position {position:?}")),
        None => problems.push("position is required".to_string()),
    }

    for question in catalog.general_questions() {
        match submission.general_ratings.get(&question.id) {
            Some(&rating) if is_scale_answer(rating) => {}
            Some(rating) => problems.push(format!("{} has invalid rating {rating}", question.id)),
            None => problems.push(format!("{} is unanswered", question.id)),
        }
    }
    for id in submission.general_ratings.keys() {
        if catalog.question(id).is_none() {
            problems.push(format!("unknown question {id}"));
        }
    }

    match submission.selected_day {
        Some(day) => {
            for (session_id, answers) in &submission.session_ratings {
                match catalog.session(session_id) {
                    Some(session) if session.day == day => {}
                    Some(_) => problems.push(format!("session {session_id} is not held on {day}")),
                    None => problems.push(format!("unknown session {session_id}")),
                }
                for (question_id, &rating) in answers {
                    if !catalog.has_session_question(question_id) {
                        problems.push(format!("unknown session question {question_id}"));
                    } else if !is_scale_answer(rating) {
                        problems.push(format!(
                            "{session_id}/{question_id} has invalid rating {rating}"
                        ));
                    }
                }
            }
        }
        None => problems.push("day must be 1, 2 or 3".to_string()),
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { problems })
    }
}
