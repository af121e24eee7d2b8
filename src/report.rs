use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::catalog::{Category, QuestionCatalog};
use crate::labels::RatingLabel;
use crate::models::{AggregateReport, Day, RatingStat};

fn rating_cell(rating: f64) -> String {
    match RatingLabel::classify(rating) {
        RatingLabel::NoData => RatingLabel::NoData.to_string(),
        label => format!("{:.2} ({})", rating, label),
    }
}

fn stat_row(output: &mut String, text: &str, stat: Option<&RatingStat>) {
    let stat = stat.copied().unwrap_or_default();
    let _ = writeln!(
        output,
        "| {} | {} | {} |",
        text,
        stat.count,
        rating_cell(stat.avg)
    );
}

/// Distribution entries, most frequent first.
fn ranked(distribution: &std::collections::BTreeMap<String, u64>) -> Vec<(&String, u64)> {
    let mut entries: Vec<(&String, u64)> = distribution.iter().map(|(k, v)| (k, *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn build_report(
    report: &AggregateReport,
    catalog: &QuestionCatalog,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();
    let event = &catalog.event;

    let _ = writeln!(output, "# {}: Evaluation Results", event.title);
    let _ = writeln!(output, "{} at {}", event.date, event.venue);
    let _ = writeln!(
        output,
        "Organized by {}. Generated {}",
        event.organizer,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Total respondents: {}", report.total_respondents);
    let _ = writeln!(
        output,
        "- Overall rating: {}",
        rating_cell(report.overall_rating)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Breakdown");
    let _ = writeln!(
        output,
        "| Day | Respondents | Overall | Program Management | Meals | Venue |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|");
    for day in Day::ALL {
        let ratings = report.daily_ratings.get(&day).copied().unwrap_or_default();
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} |",
            day,
            report.daily_respondents.get(&day).copied().unwrap_or(0),
            rating_cell(ratings.overall),
            rating_cell(ratings.pmt),
            rating_cell(ratings.meals),
            rating_cell(ratings.venue)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Respondent Profile");
    for (title, distribution) in [
        ("Sex", &report.sex_distribution),
        ("Position", &report.position_distribution),
    ] {
        let _ = writeln!(output, "### {}", title);
        if distribution.is_empty() {
            let _ = writeln!(output, "No responses recorded.");
        } else {
            for (value, count) in ranked(distribution) {
                let _ = writeln!(output, "- {}: {}", value, count);
            }
        }
        let _ = writeln!(output);
    }

    let _ = writeln!(output, "## Program Evaluation");
    for category in Category::ALL {
        let questions = catalog.questions_in(category);
        if questions.is_empty() {
            continue;
        }
        let _ = writeln!(output, "### {}", category);
        let _ = writeln!(output, "| Question | Responses | Average |");
        let _ = writeln!(output, "|---|---|---|");
        for q in questions {
            stat_row(&mut output, &q.text, report.general_ratings.get(&q.id));
        }
        let _ = writeln!(output);
    }

    let _ = writeln!(output, "## Session Evaluation");
    for day in Day::ALL {
        let mut sessions = catalog.sessions_for_day(day).peekable();
        if sessions.peek().is_none() {
            continue;
        }
        let _ = writeln!(output, "### {}", day);
        for session in sessions {
            let _ = writeln!(output, "#### {}", session.title);
            if !session.speakers.is_empty() {
                let names: Vec<&str> = session.speakers.iter().map(|s| s.name.as_str()).collect();
                let _ = writeln!(output, "Speakers: {}", names.join(", "));
            }
            let answers = report.session_ratings.get(&session.id);
            let _ = writeln!(output, "| Question | Responses | Average |");
            let _ = writeln!(output, "|---|---|---|");
            for q in catalog.session_questions.iter() {
                stat_row(&mut output, &q.text, answers.and_then(|a| a.get(&q.id)));
            }
            let _ = writeln!(output);
        }
    }

    let _ = writeln!(output, "## Comments");
    for (title, comments) in [
        ("Strengths", &report.comments.strengths),
        ("Areas for Improvement", &report.comments.improvements),
    ] {
        let _ = writeln!(output, "### {}", title);
        if comments.is_empty() {
            let _ = writeln!(output, "No comments submitted.");
        } else {
            for comment in comments.iter() {
                let _ = writeln!(output, "- {}", single_line(comment));
            }
        }
        let _ = writeln!(output);
    }

    output
}

/// Headline numbers for the terminal.
pub fn build_summary(report: &AggregateReport) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Respondents: {}", report.total_respondents);
    let _ = writeln!(output, "Overall rating: {}", rating_cell(report.overall_rating));
    for day in Day::ALL {
        let ratings = report.daily_ratings.get(&day).copied().unwrap_or_default();
        let _ = writeln!(
            output,
            "- {}: {} respondents, overall {}",
            day,
            report.daily_respondents.get(&day).copied().unwrap_or(0),
            rating_cell(ratings.overall)
        );
    }
    output
}
