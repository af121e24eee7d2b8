//! Question catalog for the event: the questions asked, the sessions held on
//! each day and the fixed lists offered by the profile form.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Day;

/// Bucket a general question rolls up into on the daily breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ProgramManagement,
    Meals,
    Venue,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::ProgramManagement,
        Category::Venue,
        Category::Meals,
    ];

    /// Category implied by a question id. `pm` must be tested before `m`.
    pub fn from_id_prefix(id: &str) -> Category {
        if id.starts_with("pm") {
            Category::ProgramManagement
        } else if id.starts_with('m') {
            Category::Meals
        } else {
            Category::Venue
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::ProgramManagement => write!(f, "Program Management"),
            Category::Meals => write!(f, "Meals"),
            Category::Venue => write!(f, "Venue"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub category: Category,
}

/// A question asked once for every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionQuestion {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    pub id: String,
    pub name: String,
    pub topic: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub day: Day,
    pub title: String,
    #[serde(default)]
    pub speakers: Vec<Speaker>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    pub title: String,
    pub date: String,
    pub venue: String,
    pub organizer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionCatalog {
    pub event: EventDetails,
    pub positions: Vec<String>,
    pub program_questions: Vec<Question>,
    pub venue_questions: Vec<Question>,
    pub meal_questions: Vec<Question>,
    pub session_questions: Vec<SessionQuestion>,
    pub sessions: Vec<Session>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog")]
    Parse(#[from] toml::de::Error),
    #[error("question {id} is listed under {listed} but its id prefix maps to {implied}")]
    CategoryMismatch {
        id: String,
        listed: Category,
        implied: Category,
    },
    #[error("duplicate id {0} in catalog")]
    DuplicateId(String),
}

#[derive(Deserialize)]
struct QuestionEntry {
    id: String,
    text: String,
}

#[derive(Deserialize)]
struct CatalogFile {
    event: EventDetails,
    #[serde(default)]
    positions: Vec<String>,
    #[serde(default)]
    program_questions: Vec<QuestionEntry>,
    #[serde(default)]
    venue_questions: Vec<QuestionEntry>,
    #[serde(default)]
    meal_questions: Vec<QuestionEntry>,
    #[serde(default)]
    session_questions: Vec<SessionQuestion>,
    #[serde(default)]
    sessions: Vec<Session>,
}

impl QuestionCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(contents)?;
        let catalog = QuestionCatalog {
            event: file.event,
            positions: file.positions,
            program_questions: tag(file.program_questions, Category::ProgramManagement)?,
            venue_questions: tag(file.venue_questions, Category::Venue)?,
            meal_questions: tag(file.meal_questions, Category::Meals)?,
            session_questions: file.session_questions,
            sessions: file.sessions,
        };
        catalog.check_unique_ids()?;
        Ok(catalog)
    }

    /// Program, venue and meal questions, in that order.
    pub fn general_questions(&self) -> impl Iterator<Item = &Question> {
        self.program_questions
            .iter()
            .chain(self.venue_questions.iter())
            .chain(self.meal_questions.iter())
    }

    pub fn questions_in(&self, category: Category) -> &[Question] {
        match category {
            Category::ProgramManagement => &self.program_questions,
            Category::Venue => &self.venue_questions,
            Category::Meals => &self.meal_questions,
        }
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.general_questions().find(|q| q.id == id)
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn sessions_for_day(&self, day: Day) -> impl Iterator<Item = &Session> {
        self.sessions.iter().filter(move |s| s.day == day)
    }

    pub fn has_session_question(&self, id: &str) -> bool {
        self.session_questions.iter().any(|q| q.id == id)
    }

    fn check_unique_ids(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for id in self.general_questions().map(|q| q.id.as_str()) {
            if !seen.insert(id) {
                return Err(CatalogError::DuplicateId(id.to_string()));
            }
        }
        let mut seen = HashSet::new();
        for id in self.session_questions.iter().map(|q| q.id.as_str()) {
            if !seen.insert(id) {
                return Err(CatalogError::DuplicateId(id.to_string()));
            }
        }
        let mut seen = HashSet::new();
        for id in self.sessions.iter().map(|s| s.id.as_str()) {
            if !seen.insert(id) {
                return Err(CatalogError::DuplicateId(id.to_string()));
            }
        }
        Ok(())
    }
}

fn tag(entries: Vec<QuestionEntry>, listed: Category) -> Result<Vec<Question>, CatalogError> {
    entries
        .into_iter()
        .map(|entry| {
            let implied = Category::from_id_prefix(&entry.id);
            if implied != listed {
                return Err(CatalogError::CategoryMismatch {
                    id: entry.id,
                    listed,
                    implied,
                });
            }
            Ok(Question {
                id: entry.id,
                text: entry.text,
                category: listed,
            })
        })
        .collect()
}

fn question(id: &str, text: &str) -> Question {
    Question {
        id: id.to_string(),
        text: text.to_string(),
        category: Category::from_id_prefix(id),
    }
}

fn session(id: &str, day: u8, title: &str, speaker: (&str, &str, &str)) -> Session {
    Session {
        id: id.to_string(),
        day: Day::ALL[usize::from(day - 1)],
        title: title.to_string(),
        speakers: vec![Speaker {
            id: speaker.0.to_string(),
            name: speaker.1.to_string(),
            topic: speaker.2.to_string(),
            role: None,
        }],
    }
}

impl Default for QuestionCatalog {
    fn default() -> Self {
        let positions = [
            "Master Teacher I",
            "Master Teacher II",
            "Master Teacher III",
            "Master Teacher IV",
            "Master Teacher V",
            "Principal I",
            "Principal II",
            "Principal III",
            "Principal IV",
            "Public School District Supervisor",
            "Education Program Supervisor",
            "Assistant School Division Superintendent",
            "School Division Superintendent",
        ];

        QuestionCatalog {
            event: EventDetails {
                title: "Complaint Management at the School Level Cum MANCOM Meeting".to_string(),
                date: "February 11-13, 2026".to_string(),
                venue: "Development Academy of the Philippines (DAP) Tagaytay City".to_string(),
                organizer: "Schools Division Office of Quezon City".to_string(),
            },
            positions: positions.iter().map(|p| p.to_string()).collect(),
            program_questions: vec![
                question("pm1", "Registration process was systematic and efficient."),
                question("pm2", "The secretariat/program management team was helpful."),
                question("pm3", "The seminar objectives were clearly met."),
                question("pm4", "The activities followed the published program schedule."),
            ],
            venue_questions: vec![
                question("v1", "The venue (DAP Tagaytay) was conducive to learning."),
                question("v2", "The session hall was clean, well lit and well ventilated."),
                question("v3", "Sound and projection equipment worked properly."),
            ],
            meal_questions: vec![
                question("m1", "Meals were served on time."),
                question("m2", "Food quality and quantity were satisfactory."),
                question("m3", "Snacks and refreshments were adequate."),
            ],
            session_questions: vec![
                SessionQuestion {
                    id: "sq1".to_string(),
                    text: "The speaker demonstrated mastery of the topic.".to_string(),
                },
                SessionQuestion {
                    id: "sq2".to_string(),
                    text: "The topic was relevant to my role/function.".to_string(),
                },
                SessionQuestion {
                    id: "sq3".to_string(),
                    text: "The presentation materials were clear and readable.".to_string(),
                },
                SessionQuestion {
                    id: "sq4".to_string(),
                    text: "Time management was observed.".to_string(),
                },
            ],
            sessions: vec![
                session(
                    "d1-s1",
                    1,
                    "Session 1: Application of Procurement Law in the School Setting",
                    ("spk-1", "Atty. Ruhjen S. Osmeña", "Procurement Law"),
                ),
                session(
                    "d1-s2",
                    1,
                    "Session 2: Restorative Justice and Victimology",
                    ("spk-2", "Dr. Janette S. Padua", "Restorative Justice"),
                ),
                session(
                    "d1-s3",
                    1,
                    "Session 3: Salient Features of DepEd Order 49, s. 2006",
                    ("spk-3", "Atty. Hiede S. Manginga", "DepEd Order 49"),
                ),
                session(
                    "d2-s4",
                    2,
                    "Session 4: Proper Handling of Child Protection Concerns",
                    ("spk-4", "Atty. Ruhjen S. Osmeña", "Child Protection"),
                ),
                session(
                    "d2-s5",
                    2,
                    "Session 5: Legal Matters that School Heads Should Know",
                    ("spk-5", "Atty. Analiza G. Esperanza", "Legal Matters"),
                ),
                session(
                    "d2-s6",
                    2,
                    "Session 6: PTA Common Issues and Concerns (DO 13, s. 2022)",
                    ("spk-6", "Atty. Katherine Mae M. Hoggang", "PTA Issues"),
                ),
                session(
                    "d3-s7",
                    3,
                    "Session 7: Grievance and Mediation",
                    ("spk-7", "Atty. Jean N. Litusquen", "Grievance and Mediation"),
                ),
                session(
                    "d3-mancom",
                    3,
                    "Management Committee Meeting",
                    ("spk-8", "Carleen S. Sedilla, CESO V", "SDS Address / MANCOM"),
                ),
            ],
        }
    }
}
