//! Insertable row types and the JSON import bundle.

use aitutor_shared::{Block, QuestionType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub id: String,
    pub term: String,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faq {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Relevance multiplier.
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub course_id: Option<String>,
}

fn default_priority() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub long_description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    #[serde(default)]
    pub course_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ai_feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    #[serde(default)]
    pub module_id: Option<String>,
    #[serde(default, rename = "type")]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub resource_url: Option<String>,
    #[serde(default)]
    pub ai_feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub module_id: Option<String>,
    #[serde(default)]
    pub course_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: String,
    #[serde(default)]
    pub quiz_id: Option<String>,
    pub question_text: String,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// A questionnaire question as stored.
///
/// `scoring_map` is kept as raw JSON; it is validated when questions are
/// loaded, not when they are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRow {
    pub id: String,
    pub code: String,
    pub section: String,
    pub block: Block,
    #[serde(default)]
    pub area_id: Option<String>,
    pub role_id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub scoring_map: serde_json::Value,
    #[serde(default)]
    pub position: i64,
}

/// Everything `import` can load in one go.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentBundle {
    #[serde(default)]
    pub glossary: Vec<GlossaryTerm>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default)]
    pub quiz_questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub questions: Vec<QuestionRow>,
}

/// Row counts written by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub content_rows: usize,
    pub questions: usize,
}
