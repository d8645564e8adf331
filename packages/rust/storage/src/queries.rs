//! Relevance query builder.
//!
//! One `SELECT` per content source, each projecting the same thirteen
//! columns (see [`COLUMNS`]) so rows from any source decode the same way and
//! the statements can be glued into a single `UNION ALL`. Every statement
//! binds the lower-cased `LIKE` pattern as `?1` against the row's
//! `search_text` and computes a non-negative integer `relevance`; NULL text
//! counts as the empty string.
//!
//! `search_text` is lower-cased in Rust when a row is written, because
//! SQLite's `LOWER` only folds ASCII.

use aitutor_shared::SourceKind;

/// Projected column order shared by every source statement.
pub const COLUMNS: [&str; 13] = [
    "source",
    "id",
    "course_id",
    "module_id",
    "category",
    "term",
    "definition",
    "question",
    "answer",
    "title",
    "description",
    "content",
    "relevance",
];

const GLOSSARY_SQL: &str = r#"SELECT 'glossary' AS source, g.id AS id,
       NULL AS course_id, NULL AS module_id,
       COALESCE(g.category, 'glossary') AS category,
       g.term AS term, g.definition AS definition,
       NULL AS question, NULL AS answer,
       NULL AS title, NULL AS description, NULL AS content,
       LENGTH(COALESCE(g.term, '')) AS relevance
FROM glossary_terms g
WHERE g.search_text LIKE ?1 ESCAPE '\'"#;

const FAQ_SQL: &str = r#"SELECT 'faq' AS source, f.id AS id,
       f.course_id AS course_id, NULL AS module_id,
       COALESCE(f.category, 'faq') AS category,
       NULL AS term, NULL AS definition,
       f.question AS question, f.answer AS answer,
       NULL AS title, NULL AS description, NULL AS content,
       (LENGTH(COALESCE(f.question, '')) + LENGTH(COALESCE(f.answer, '')))
           * MAX(COALESCE(f.priority, 1), 0) AS relevance
FROM faqs f
WHERE f.search_text LIKE ?1 ESCAPE '\'"#;

const COURSE_SQL: &str = r#"SELECT 'course' AS source, c.id AS id,
       c.id AS course_id, NULL AS module_id,
       COALESCE(c.category, 'course') AS category,
       NULL AS term, NULL AS definition,
       NULL AS question, NULL AS answer,
       c.name AS title, c.short_description AS description,
       c.long_description AS content,
       LENGTH(COALESCE(c.name, '')) + LENGTH(COALESCE(c.long_description, '')) AS relevance
FROM courses c
WHERE c.search_text LIKE ?1 ESCAPE '\'"#;

const MODULE_SQL: &str = r#"SELECT 'module' AS source, m.id AS id,
       m.course_id AS course_id, m.id AS module_id,
       'module' AS category,
       NULL AS term, NULL AS definition,
       NULL AS question, NULL AS answer,
       m.title AS title, m.description AS description, m.ai_feedback AS content,
       LENGTH(COALESCE(m.title, '')) + LENGTH(COALESCE(m.description, '')) AS relevance
FROM modules m
WHERE m.search_text LIKE ?1 ESCAPE '\'"#;

const ACTIVITY_SQL: &str = r#"SELECT 'activity' AS source, a.id AS id,
       m.course_id AS course_id, a.module_id AS module_id,
       'activity' AS category,
       NULL AS term, NULL AS definition,
       NULL AS question, NULL AS answer,
       COALESCE(a.content_type, a.type) AS title,
       a.ai_feedback AS description, a.resource_url AS content,
       LENGTH(COALESCE(a.ai_feedback, '')) + LENGTH(COALESCE(a.resource_url, '')) AS relevance
FROM activities a
LEFT JOIN modules m ON m.id = a.module_id
WHERE a.search_text LIKE ?1 ESCAPE '\'"#;

const QUIZ_QUESTION_SQL: &str = r#"SELECT 'quiz_question' AS source, qq.id AS id,
       COALESCE(qz.course_id, m.course_id) AS course_id, qz.module_id AS module_id,
       'quiz' AS category,
       NULL AS term, NULL AS definition,
       qq.question_text AS question, qq.correct_answer AS answer,
       qz.title AS title, NULL AS description, qq.options AS content,
       LENGTH(COALESCE(qq.question_text, '')) + LENGTH(COALESCE(qq.correct_answer, '')) AS relevance
FROM quiz_questions qq
LEFT JOIN quizzes qz ON qz.id = qq.quiz_id
LEFT JOIN modules m ON m.id = qz.module_id
WHERE qq.search_text LIKE ?1 ESCAPE '\'"#;

/// Separator between fields in `search_text`, so a pattern never matches
/// across two fields.
const FIELD_SEPARATOR: char = '\u{1f}';

/// Searchable columns per content table, in `search_text` order.
pub(crate) const SEARCH_COLUMNS: [(&str, &[&str]); 6] = [
    ("glossary_terms", &["term", "definition"]),
    ("faqs", &["question", "answer"]),
    ("courses", &["name", "short_description", "long_description"]),
    ("modules", &["title", "description", "ai_feedback"]),
    ("activities", &["type", "content_type", "resource_url", "ai_feedback"]),
    ("quiz_questions", &["question_text", "correct_answer", "options"]),
];

/// Build the lower-cased match text for a row from its searchable fields.
pub fn search_text<'a>(fields: impl IntoIterator<Item = Option<&'a str>>) -> String {
    let mut text = String::new();
    for field in fields.into_iter().flatten() {
        if !text.is_empty() {
            text.push(FIELD_SEPARATOR);
        }
        text.push_str(&field.to_lowercase());
    }
    text
}

/// The `SELECT` for one source.
pub fn source_query(source: SourceKind) -> &'static str {
    match source {
        SourceKind::Glossary => GLOSSARY_SQL,
        SourceKind::Faq => FAQ_SQL,
        SourceKind::Course => COURSE_SQL,
        SourceKind::Module => MODULE_SQL,
        SourceKind::Activity => ACTIVITY_SQL,
        SourceKind::QuizQuestion => QUIZ_QUESTION_SQL,
    }
}

/// All six sources as one statement, globally ranked and limited.
///
/// Produces the same rows, in the same order, as fanning out with
/// [`source_query`] and merging by relevance desc then source asc.
pub fn combined_query(limit: usize) -> String {
    let selects: Vec<&str> = SourceKind::ALL.iter().map(|s| source_query(*s)).collect();
    format!(
        "{}\nORDER BY relevance DESC, source ASC\nLIMIT {limit}",
        selects.join("\nUNION ALL\n")
    )
}
