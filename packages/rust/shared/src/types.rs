//! Core domain types: content records for chatbot context and the
//! questionnaire model.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// The six content sources searched for chatbot context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Glossary,
    Faq,
    Course,
    Module,
    Activity,
    QuizQuestion,
}

impl SourceKind {
    /// Every source, in fan-out order.
    pub const ALL: [SourceKind; 6] = [
        Self::Glossary,
        Self::Faq,
        Self::Course,
        Self::Module,
        Self::Activity,
        Self::QuizQuestion,
    ];

    /// Wire tag, also the secondary sort key of ranked results.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Glossary => "glossary",
            Self::Faq => "faq",
            Self::Course => "course",
            Self::Module => "module",
            Self::Activity => "activity",
            Self::QuizQuestion => "quiz_question",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown content source '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// RawRow
// ---------------------------------------------------------------------------

/// One content-store hit before normalization.
///
/// Carries every field any source can produce; most are `None` for a given
/// source. `relevance` is only used for ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub source: String,
    pub id: String,
    pub course_id: Option<String>,
    pub module_id: Option<String>,
    pub category: Option<String>,
    pub term: Option<String>,
    pub definition: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub relevance: i64,
}

// ---------------------------------------------------------------------------
// ContentRecord
// ---------------------------------------------------------------------------

/// Title/description/content triple shared by courses, modules and activities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
}

/// Variant-specific part of a [`ContentRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBody {
    Glossary {
        term: Option<String>,
        definition: Option<String>,
    },
    Faq {
        question: Option<String>,
        answer: Option<String>,
    },
    Course(LessonFields),
    Module(LessonFields),
    Activity(LessonFields),
    QuizQuestion {
        question: Option<String>,
        answer: Option<String>,
        title: Option<String>,
        content: Option<String>,
    },
    /// A source tag this build does not know; carries common fields only.
    Unrecognized { source: String },
}

/// Normalized chatbot context record.
///
/// Serializes as a flat object: `source`, `id`, `course_id`, `module_id`,
/// `category`, then only the fields of its variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub id: String,
    pub course_id: Option<String>,
    pub module_id: Option<String>,
    pub category: String,
    pub body: RecordBody,
}

impl ContentRecord {
    /// The source tag of this record.
    pub fn source(&self) -> &str {
        match &self.body {
            RecordBody::Glossary { .. } => SourceKind::Glossary.as_str(),
            RecordBody::Faq { .. } => SourceKind::Faq.as_str(),
            RecordBody::Course(_) => SourceKind::Course.as_str(),
            RecordBody::Module(_) => SourceKind::Module.as_str(),
            RecordBody::Activity(_) => SourceKind::Activity.as_str(),
            RecordBody::QuizQuestion { .. } => SourceKind::QuizQuestion.as_str(),
            RecordBody::Unrecognized { source } => source,
        }
    }

    /// Variant fields in display order, with their names.
    pub fn fields(&self) -> Vec<(&'static str, Option<&str>)> {
        match &self.body {
            RecordBody::Glossary { term, definition } => vec![
                ("term", term.as_deref()),
                ("definition", definition.as_deref()),
            ],
            RecordBody::Faq { question, answer } => vec![
                ("question", question.as_deref()),
                ("answer", answer.as_deref()),
            ],
            RecordBody::Course(lesson) | RecordBody::Module(lesson) | RecordBody::Activity(lesson) => {
                vec![
                    ("title", lesson.title.as_deref()),
                    ("description", lesson.description.as_deref()),
                    ("content", lesson.content.as_deref()),
                ]
            }
            RecordBody::QuizQuestion {
                question,
                answer,
                title,
                content,
            } => vec![
                ("question", question.as_deref()),
                ("answer", answer.as_deref()),
                ("title", title.as_deref()),
                ("content", content.as_deref()),
            ],
            RecordBody::Unrecognized { .. } => Vec::new(),
        }
    }
}

impl Serialize for ContentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let fields = self.fields();
        let mut map = serializer.serialize_map(Some(5 + fields.len()))?;
        map.serialize_entry("source", self.source())?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("course_id", &self.course_id)?;
        map.serialize_entry("module_id", &self.module_id)?;
        map.serialize_entry("category", &self.category)?;
        for (name, value) in fields {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Questionnaire
// ---------------------------------------------------------------------------

/// Scoring block a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Block {
    Adoption,
    Knowledge,
}

impl Block {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adoption => "Adoption",
            Self::Knowledge => "Knowledge",
        }
    }
}

impl FromStr for Block {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adoption" => Ok(Self::Adoption),
            "knowledge" => Ok(Self::Knowledge),
            other => Err(format!("unknown block '{other}'")),
        }
    }
}

/// How a question is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    SingleChoice,
    LikertSingleChoice,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleChoice => "single-choice",
            Self::LikertSingleChoice => "likert-single-choice",
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "single-choice" => Ok(Self::SingleChoice),
            "likert-single-choice" => Ok(Self::LikertSingleChoice),
            other => Err(format!("unknown question type '{other}'")),
        }
    }
}

/// Option letter → score table of a question.
///
/// A table that could not be parsed is kept as [`ScoringMap::Malformed`] so
/// the question still loads; it contributes 0 to every score.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringMap {
    Table(BTreeMap<String, f64>),
    Malformed { reason: String },
}

impl ScoringMap {
    /// Parse a JSON object such as `{"A": 0, "B": 50, "C": 100}`.
    ///
    /// Keys are normalized to trimmed upper case.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<BTreeMap<String, f64>>(raw) {
            Ok(table) => Self::Table(
                table
                    .into_iter()
                    .map(|(letter, score)| (normalize_letter(&letter), score))
                    .collect(),
            ),
            Err(e) => Self::Malformed {
                reason: e.to_string(),
            },
        }
    }

    /// Build from an already-structured table.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self::Table(
            pairs
                .into_iter()
                .map(|(letter, score)| (normalize_letter(letter), score))
                .collect(),
        )
    }
}

/// Normalize an option letter for comparison (`" b "` → `"B"`).
pub fn normalize_letter(letter: &str) -> String {
    letter.trim().to_uppercase()
}

/// Parse a question's options column, which must be a JSON array of strings.
pub fn parse_options(raw: &str) -> std::result::Result<Vec<String>, String> {
    serde_json::from_str::<Vec<String>>(raw)
        .map_err(|e| format!("options are not a JSON array of strings: {e}"))
}

/// A questionnaire question, immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: String,
    pub code: String,
    pub section: String,
    pub block: Block,
    pub area_id: Option<String>,
    pub role_id: String,
    pub text: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub scoring_map: ScoringMap,
}

/// A respondent's answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub question_id: String,
    pub answer: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Three-bucket proficiency classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Basic,
    Intermediate,
    Advanced,
}

impl Classification {
    /// Bucket a total score: below 40 Basic, below 70 Intermediate, else Advanced.
    pub fn from_total(total: f64) -> Self {
        if total < 40.0 {
            Self::Basic
        } else if total < 70.0 {
            Self::Intermediate
        } else {
            Self::Advanced
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

/// Outcome of scoring one submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub adoption_score: f64,
    pub knowledge_score: f64,
    pub total_score: f64,
    pub classification: Classification,
}

/// `{question_id, answer}` pair handed to the response sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerPair {
    pub question_id: String,
    pub answer: String,
}

/// A scored questionnaire submission, ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub role_id: String,
    pub answers: Vec<AnswerPair>,
    pub score: ScoreResult,
    pub submitted_at: DateTime<Utc>,
}
