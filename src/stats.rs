use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::{Category, QuestionCatalog};
use crate::models::{
    AggregateReport, CommentCollation, DailyRatings, Day, RatingStat, Submission, UNSPECIFIED,
};

/// Running sum and count of ratings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    sum: f64,
    count: u64,
}

impl Accumulator {
    pub fn add(&mut self, rating: f64) {
        self.sum += rating;
        self.count += 1;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    fn stat(&self) -> RatingStat {
        RatingStat {
            sum: self.sum,
            count: self.count,
            avg: self.mean(),
        }
    }
}

#[derive(Debug, Default)]
struct DayTotals {
    respondents: u64,
    overall: Accumulator,
    pmt: Accumulator,
    meals: Accumulator,
    venue: Accumulator,
}

impl DayTotals {
    fn category_mut(&mut self, category: Category) -> &mut Accumulator {
        match category {
            Category::ProgramManagement => &mut self.pmt,
            Category::Meals => &mut self.meals,
            Category::Venue => &mut self.venue,
        }
    }

    fn ratings(&self) -> DailyRatings {
        DailyRatings {
            overall: self.overall.mean(),
            pmt: self.pmt.mean(),
            meals: self.meals.mean(),
            venue: self.venue.mean(),
        }
    }
}

struct GeneralSlot {
    category: Category,
    totals: Accumulator,
}

/// Accumulators for one aggregation pass, seeded from the catalog so every
/// declared question is present in the finished report.
struct ReportBuilder {
    respondents: u64,
    grand: Accumulator,
    days: BTreeMap<Day, DayTotals>,
    sex: BTreeMap<String, u64>,
    position: BTreeMap<String, u64>,
    general: BTreeMap<String, GeneralSlot>,
    sessions: BTreeMap<String, BTreeMap<String, Accumulator>>,
    comments: CommentCollation,
    skipped: u64,
    uncatalogued: u64,
}

impl ReportBuilder {
    fn new(catalog: &QuestionCatalog) -> Self {
        let general = catalog
            .general_questions()
            .map(|q| {
                (
                    q.id.clone(),
                    GeneralSlot {
                        category: q.category,
                        totals: Accumulator::default(),
                    },
                )
            })
            .collect();

        let sessions = catalog
            .sessions
            .iter()
            .map(|s| {
                let questions = catalog
                    .session_questions
                    .iter()
                    .map(|q| (q.id.clone(), Accumulator::default()))
                    .collect();
                (s.id.clone(), questions)
            })
            .collect();

        ReportBuilder {
            respondents: 0,
            grand: Accumulator::default(),
            days: Day::ALL.iter().map(|d| (*d, DayTotals::default())).collect(),
            sex: BTreeMap::new(),
            position: BTreeMap::new(),
            general,
            sessions,
            comments: CommentCollation::default(),
            skipped: 0,
            uncatalogued: 0,
        }
    }

    fn ingest(&mut self, submission: &Submission) {
        let day = submission.selected_day;

        self.respondents += 1;
        *self
            .sex
            .entry(bucket_key(submission.profile.sex.as_deref()))
            .or_default() += 1;
        *self
            .position
            .entry(bucket_key(submission.profile.position.as_deref()))
            .or_default() += 1;

        if let Some(day) = day {
            self.days.entry(day).or_default().respondents += 1;
        }

        for (id, &rating) in &submission.general_ratings {
            if !rating.is_finite() {
                self.skipped += 1;
                continue;
            }
            // Ids outside the catalog have no per-question slot but still
            // count toward the grand and daily means.
            let category = match self.general.get_mut(id) {
                Some(slot) => {
                    slot.totals.add(rating);
                    slot.category
                }
                None => {
                    self.uncatalogued += 1;
                    Category::from_id_prefix(id)
                }
            };
            self.grand.add(rating);
            if let Some(day) = day {
                let totals = self.days.entry(day).or_default();
                totals.overall.add(rating);
                totals.category_mut(category).add(rating);
            }
        }

        // Session ratings feed the day's overall mean only.
        for (session_id, answers) in &submission.session_ratings {
            let Some(questions) = self.sessions.get_mut(session_id) else {
                self.skipped += answers.len() as u64;
                continue;
            };
            for (question_id, &rating) in answers {
                let totals = match questions.get_mut(question_id) {
                    Some(totals) if rating.is_finite() => totals,
                    _ => {
                        self.skipped += 1;
                        continue;
                    }
                };
                totals.add(rating);
                self.grand.add(rating);
                if let Some(day) = day {
                    self.days.entry(day).or_default().overall.add(rating);
                }
            }
        }

        push_comment(&mut self.comments.strengths, &submission.comments.strengths);
        push_comment(
            &mut self.comments.improvements,
            &submission.comments.improvements,
        );
    }

    fn finish(self) -> AggregateReport {
        AggregateReport {
            total_respondents: self.respondents,
            daily_respondents: self
                .days
                .iter()
                .map(|(day, totals)| (*day, totals.respondents))
                .collect(),
            overall_rating: self.grand.mean(),
            daily_ratings: self
                .days
                .iter()
                .map(|(day, totals)| (*day, totals.ratings()))
                .collect(),
            sex_distribution: self.sex,
            position_distribution: self.position,
            general_ratings: self
                .general
                .into_iter()
                .map(|(id, slot)| (id, slot.totals.stat()))
                .collect(),
            session_ratings: self
                .sessions
                .into_iter()
                .map(|(id, questions)| {
                    let stats = questions
                        .into_iter()
                        .map(|(question_id, totals)| (question_id, totals.stat()))
                        .collect();
                    (id, stats)
                })
                .collect(),
            comments: self.comments,
        }
    }
}

/// The literal value, or `Unspecified` when it is missing or blank.
fn bucket_key(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => UNSPECIFIED.to_string(),
    }
}

// Blank comments are dropped here rather than by the renderer.
fn push_comment(list: &mut Vec<String>, text: &str) {
    if !text.trim().is_empty() {
        list.push(text.to_string());
    }
}

/// Reduces every submission into one report in a single pass.
///
/// Numeric results do not depend on the order of `submissions`; comment
/// lists keep that order.
pub fn aggregate(submissions: &[Submission], catalog: &QuestionCatalog) -> AggregateReport {
    let mut builder = ReportBuilder::new(catalog);
    for submission in submissions {
        builder.ingest(submission);
    }
    debug!(
        "aggregated {} submissions, {} ratings pooled ({} without a catalog question), {} skipped",
        builder.respondents, builder.grand.count, builder.uncatalogued, builder.skipped
    );
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EventDetails, Question, Session, SessionQuestion};

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {id}"),
            category: Category::from_id_prefix(id),
        }
    }

    fn test_catalog() -> QuestionCatalog {
        QuestionCatalog {
            event: EventDetails {
                title: "Workshop".to_string(),
                date: "February 11, 2026".to_string(),
                venue: "Hall".to_string(),
                organizer: "Office".to_string(),
            },
            positions: vec!["Principal I".to_string()],
            program_questions: vec![question("pm1"), question("pm2")],
            venue_questions: vec![question("v1")],
            meal_questions: vec![question("m1")],
            session_questions: vec![
                SessionQuestion {
                    id: "sq1".to_string(),
                    text: "Mastery".to_string(),
                },
                SessionQuestion {
                    id: "sq2".to_string(),
                    text: "Relevance".to_string(),
                },
            ],
            sessions: vec![
                Session {
                    id: "s1".to_string(),
                    day: Day::ALL[0],
                    title: "Session 1".to_string(),
                    speakers: Vec::new(),
                },
                Session {
                    id: "s2".to_string(),
                    day: Day::ALL[1],
                    title: "Session 2".to_string(),
                    speakers: Vec::new(),
                },
            ],
        }
    }

    fn submission(day: Option<u8>, general: &[(&str, f64)]) -> Submission {
        Submission {
            selected_day: day.and_then(|d| Day::new(i64::from(d))),
            general_ratings: general
                .iter()
                .map(|(id, v)| (id.to_string(), *v))
                .collect(),
            ..Submission::default()
        }
    }

    fn with_session(mut s: Submission, session: &str, answers: &[(&str, f64)]) -> Submission {
        s.session_ratings.insert(
            session.to_string(),
            answers.iter().map(|(id, v)| (id.to_string(), *v)).collect(),
        );
        s
    }

    fn day(n: u8) -> Day {
        Day::ALL[usize::from(n - 1)]
    }

    #[test]
    fn empty_input_yields_zeroed_report() {
        let report = aggregate(&[], &test_catalog());
        assert_eq!(report.total_respondents, 0);
        assert_eq!(report.overall_rating, 0.0);
        assert!(report.sex_distribution.is_empty());
        assert!(report.position_distribution.is_empty());
        assert!(report.comments.strengths.is_empty());
        assert!(report.comments.improvements.is_empty());
        for d in Day::ALL {
            assert_eq!(report.daily_respondents[&d], 0);
            assert_eq!(report.daily_ratings[&d], DailyRatings::default());
        }
        assert!(report.general_ratings.values().all(|s| s.avg == 0.0));
    }

    #[test]
    fn catalog_questions_are_preseeded() {
        let report = aggregate(&[submission(Some(1), &[("pm1", 4.0)])], &test_catalog());
        for id in ["pm1", "pm2", "v1", "m1"] {
            assert!(report.general_ratings.contains_key(id), "{id}");
        }
        assert_eq!(report.general_ratings["pm2"], RatingStat::default());
        assert_eq!(report.session_ratings.len(), 2);
        assert_eq!(report.session_ratings["s2"]["sq2"], RatingStat::default());
    }

    #[test]
    fn overall_rating_is_a_grand_mean() {
        let submissions = vec![
            with_session(submission(Some(1), &[("pm1", 4.0)]), "s1", &[("sq1", 2.0)]),
            with_session(submission(Some(2), &[("pm1", 5.0)]), "s2", &[("sq1", 3.0)]),
            with_session(submission(None, &[("pm1", 1.0)]), "s1", &[("sq1", 4.0)]),
        ];
        let report = aggregate(&submissions, &test_catalog());
        let expected = (4.0 + 5.0 + 1.0 + 2.0 + 3.0 + 4.0) / 6.0;
        assert!((report.overall_rating - expected).abs() < 1e-9);
    }

    #[test]
    fn grand_mean_is_not_a_mean_of_means() {
        let submissions = vec![
            submission(Some(1), &[("pm1", 5.0), ("pm2", 5.0), ("v1", 5.0)]),
            submission(Some(1), &[("m1", 1.0)]),
        ];
        let report = aggregate(&submissions, &test_catalog());
        assert!((report.overall_rating - 4.0).abs() < 1e-9);
    }

    #[test]
    fn general_ratings_route_by_category() {
        let report = aggregate(&[submission(Some(1), &[("pm1", 5.0)])], &test_catalog());
        let d1 = report.daily_ratings[&day(1)];
        assert_eq!(d1.pmt, 5.0);
        assert_eq!(d1.overall, 5.0);
        assert_eq!(d1.meals, 0.0);
        assert_eq!(d1.venue, 0.0);

        let report = aggregate(&[submission(Some(1), &[("m1", 3.0)])], &test_catalog());
        assert_eq!(report.daily_ratings[&day(1)].meals, 3.0);
        assert_eq!(report.daily_ratings[&day(1)].pmt, 0.0);

        let report = aggregate(&[submission(Some(1), &[("v1", 2.0)])], &test_catalog());
        assert_eq!(report.daily_ratings[&day(1)].venue, 2.0);
        assert_eq!(report.daily_ratings[&day(1)].meals, 0.0);
    }

    #[test]
    fn session_ratings_only_feed_daily_overall() {
        let s = with_session(submission(Some(2), &[("v1", 4.0)]), "s2", &[("sq1", 2.0)]);
        let report = aggregate(&[s], &test_catalog());
        let d2 = report.daily_ratings[&day(2)];
        assert_eq!(d2.overall, 3.0);
        assert_eq!(d2.venue, 4.0);
        assert_eq!(d2.pmt, 0.0);
        assert_eq!(report.session_ratings["s2"]["sq1"].count, 1);
    }

    #[test]
    fn non_finite_ratings_are_excluded() {
        let s = submission(Some(1), &[("pm1", f64::NAN), ("v1", 3.0), ("m1", f64::INFINITY)]);
        let report = aggregate(&[s], &test_catalog());
        assert_eq!(report.general_ratings["pm1"].count, 0);
        assert_eq!(report.general_ratings["pm1"].sum, 0.0);
        assert_eq!(report.general_ratings["m1"].count, 0);
        assert_eq!(report.general_ratings["v1"].avg, 3.0);
        assert_eq!(report.overall_rating, 3.0);
        assert_eq!(report.daily_ratings[&day(1)].overall, 3.0);
    }

    #[test]
    fn unparseable_store_values_do_not_disturb_other_fields() {
        let record: crate::models::SubmissionRecord = serde_json::from_value(serde_json::json!({
            "selected_day": 1,
            "general_ratings": {"pm1": "abc", "v1": 4}
        }))
        .unwrap();
        let report = aggregate(&[crate::records::parse_record(record)], &test_catalog());
        assert_eq!(report.general_ratings["pm1"].count, 0);
        assert_eq!(report.general_ratings["v1"].sum, 4.0);
        assert_eq!(report.total_respondents, 1);
    }

    #[test]
    fn unknown_session_ids_are_ignored() {
        let s = with_session(submission(Some(1), &[("v1", 2.0)]), "s9", &[("sq1", 5.0)]);
        let s = with_session(s, "s1", &[("sq9", 5.0), ("sq2", 4.0)]);
        let report = aggregate(&[s], &test_catalog());
        assert!(!report.session_ratings.contains_key("s9"));
        assert!(!report.session_ratings["s1"].contains_key("sq9"));
        assert!((report.overall_rating - 3.0).abs() < 1e-9);
        assert!((report.daily_ratings[&day(1)].overall - 3.0).abs() < 1e-9);
    }

    #[test]
    fn uncatalogued_general_ids_feed_grand_and_daily_totals() {
        let s = submission(Some(1), &[("pm9", 5.0), ("v1", 2.0), ("m7", 3.0)]);
        let report = aggregate(&[s], &test_catalog());
        assert!(!report.general_ratings.contains_key("pm9"));
        assert!(!report.general_ratings.contains_key("m7"));
        assert!((report.overall_rating - 10.0 / 3.0).abs() < 1e-9);
        let d1 = report.daily_ratings[&day(1)];
        assert!((d1.overall - 10.0 / 3.0).abs() < 1e-9);
        assert_eq!(d1.pmt, 5.0);
        assert_eq!(d1.meals, 3.0);
        assert_eq!(d1.venue, 2.0);
    }

    #[test]
    fn legacy_general_ids_route_by_prefix() {
        let catalog = QuestionCatalog::default();
        let report = aggregate(&[submission(Some(1), &[("pm1", 4.0), ("g2", 2.0)])], &catalog);
        assert_eq!(report.overall_rating, 3.0);
        let d1 = report.daily_ratings[&day(1)];
        assert_eq!(d1.overall, 3.0);
        assert_eq!(d1.pmt, 4.0);
        assert_eq!(d1.venue, 2.0);
        assert_eq!(report.general_ratings["pm1"].count, 1);
    }

    #[test]
    fn demographics_keep_literal_values() {
        let mut padded = submission(Some(1), &[]);
        padded.profile.sex = Some(" Male".to_string());
        let mut plain = submission(Some(1), &[]);
        plain.profile.sex = Some("Male".to_string());
        let mut blank = submission(Some(1), &[]);
        blank.profile.sex = Some("   ".to_string());

        let report = aggregate(&[padded, plain, blank], &test_catalog());
        assert_eq!(report.sex_distribution.get(" Male"), Some(&1));
        assert_eq!(report.sex_distribution.get("Male"), Some(&1));
        assert_eq!(report.sex_distribution.get(UNSPECIFIED), Some(&1));
    }

    #[test]
    fn day_string_matches_integer_day() {
        let from_string: crate::models::SubmissionRecord = serde_json::from_value(
            serde_json::json!({"selected_day": "2", "general_ratings": {"pm1": 4}}),
        )
        .unwrap();
        let a = aggregate(&[crate::records::parse_record(from_string)], &test_catalog());
        let b = aggregate(&[submission(Some(2), &[("pm1", 4.0)])], &test_catalog());
        assert_eq!(a.daily_respondents, b.daily_respondents);
        assert_eq!(a.daily_ratings, b.daily_ratings);
    }

    #[test]
    fn unrecognized_day_counts_only_toward_totals() {
        let record: crate::models::SubmissionRecord = serde_json::from_value(
            serde_json::json!({"selected_day": 4, "general_ratings": {"pm1": 4}}),
        )
        .unwrap();
        let submissions = vec![
            crate::records::parse_record(record),
            submission(None, &[("v1", 2.0)]),
        ];
        let report = aggregate(&submissions, &test_catalog());
        assert_eq!(report.total_respondents, 2);
        assert_eq!(report.overall_rating, 3.0);
        assert_eq!(report.general_ratings["pm1"].count, 1);
        for d in Day::ALL {
            assert_eq!(report.daily_respondents[&d], 0);
            assert_eq!(report.daily_ratings[&d], DailyRatings::default());
        }
    }

    #[test]
    fn blank_demographics_are_unspecified() {
        let mut blank = submission(Some(1), &[]);
        blank.profile.sex = Some(String::new());
        let mut missing = submission(Some(1), &[]);
        missing.profile.position = Some("Principal I".to_string());

        let report = aggregate(&[blank, missing], &test_catalog());
        assert_eq!(report.sex_distribution.get(UNSPECIFIED), Some(&2));
        assert_eq!(report.position_distribution.get(UNSPECIFIED), Some(&1));
        assert_eq!(report.position_distribution.get("Principal I"), Some(&1));
    }

    #[test]
    fn comments_keep_order_and_skip_blanks() {
        let mut first = submission(Some(1), &[]);
        first.comments.strengths = "Great speakers".to_string();
        first.comments.improvements = "   ".to_string();
        let mut second = submission(Some(2), &[]);
        second.comments.strengths = "Good venue".to_string();
        second.comments.improvements = "Start on time".to_string();

        let report = aggregate(&[first, second], &test_catalog());
        assert_eq!(
            report.comments.strengths,
            vec!["Great speakers".to_string(), "Good venue".to_string()]
        );
        assert_eq!(report.comments.improvements, vec!["Start on time".to_string()]);
    }

    #[test]
    fn numeric_results_ignore_submission_order() {
        let mut a = submission(Some(1), &[("pm1", 4.0), ("v1", 3.0)]);
        a.profile.sex = Some("Male".to_string());
        let b = with_session(submission(Some(3), &[("m1", 2.0)]), "s1", &[("sq1", 1.0)]);
        let c = submission(Some(1), &[("pm1", 2.0)]);

        let forward = aggregate(&[a.clone(), b.clone(), c.clone()], &test_catalog());
        let backward = aggregate(&[c, b, a], &test_catalog());
        assert_eq!(forward.general_ratings, backward.general_ratings);
        assert_eq!(forward.session_ratings, backward.session_ratings);
        assert_eq!(forward.daily_ratings, backward.daily_ratings);
        assert_eq!(forward.sex_distribution, backward.sex_distribution);
        assert_eq!(forward.overall_rating, backward.overall_rating);
    }

    #[test]
    fn two_respondent_scenario() {
        let mut male = submission(Some(1), &[("pm1", 4.0), ("v1", 3.0)]);
        male.profile.sex = Some("Male".to_string());
        let mut female = submission(Some(1), &[("pm1", 2.0)]);
        female.profile.sex = Some("Female".to_string());

        let report = aggregate(&[male, female], &test_catalog());
        assert_eq!(
            report.general_ratings["pm1"],
            RatingStat {
                sum: 6.0,
                count: 2,
                avg: 3.0
            }
        );
        assert_eq!(
            report.general_ratings["v1"],
            RatingStat {
                sum: 3.0,
                count: 1,
                avg: 3.0
            }
        );
        assert_eq!(report.daily_ratings[&day(1)].pmt, 3.0);
        assert_eq!(report.daily_ratings[&day(1)].venue, 3.0);
        assert_eq!(report.daily_respondents[&day(1)], 2);
        assert_eq!(report.sex_distribution.len(), 2);
        assert_eq!(report.sex_distribution["Male"], 1);
        assert_eq!(report.sex_distribution["Female"], 1);
        assert_eq!(report.total_respondents, 2);
    }

    #[test]
    fn accumulator_mean_guards_empty() {
        let mut acc = Accumulator::default();
        assert_eq!(acc.mean(), 0.0);
        acc.add(3.0);
        acc.add(4.0);
        assert_eq!(acc.mean(), 3.5);
    }
}
