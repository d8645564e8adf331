//! SQL migration definitions for the tutor database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Adds `search_text`; rows written before it are backfilled from Rust.
pub(crate) const SEARCH_TEXT_VERSION: u32 = 3;

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Content sources: glossary, faqs, courses, modules, activities, quizzes",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS glossary_terms (
    id         TEXT PRIMARY KEY,
    term       TEXT NOT NULL,
    definition TEXT,
    category   TEXT
);

CREATE TABLE IF NOT EXISTS faqs (
    id        TEXT PRIMARY KEY,
    question  TEXT NOT NULL,
    answer    TEXT,
    category  TEXT,
    priority  INTEGER NOT NULL DEFAULT 1,
    course_id TEXT
);

CREATE TABLE IF NOT EXISTS courses (
    id                TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    short_description TEXT,
    long_description  TEXT,
    category          TEXT
);

CREATE TABLE IF NOT EXISTS modules (
    id          TEXT PRIMARY KEY,
    course_id   TEXT REFERENCES courses(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    description TEXT,
    ai_feedback TEXT
);

CREATE INDEX IF NOT EXISTS idx_modules_course_id ON modules(course_id);

CREATE TABLE IF NOT EXISTS activities (
    id           TEXT PRIMARY KEY,
    module_id    TEXT REFERENCES modules(id) ON DELETE CASCADE,
    type         TEXT,
    content_type TEXT,
    resource_url TEXT,
    ai_feedback  TEXT
);

CREATE INDEX IF NOT EXISTS idx_activities_module_id ON activities(module_id);

CREATE TABLE IF NOT EXISTS quizzes (
    id        TEXT PRIMARY KEY,
    title     TEXT NOT NULL,
    module_id TEXT REFERENCES modules(id) ON DELETE CASCADE,
    course_id TEXT REFERENCES courses(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS quiz_questions (
    id             TEXT PRIMARY KEY,
    quiz_id        TEXT REFERENCES quizzes(id) ON DELETE CASCADE,
    question_text  TEXT NOT NULL,
    correct_answer TEXT,
    options        TEXT
);

CREATE INDEX IF NOT EXISTS idx_quiz_questions_quiz_id ON quiz_questions(quiz_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Questionnaire: questions, submissions, responses",
            sql: r#"
CREATE TABLE IF NOT EXISTS questions (
    id          TEXT PRIMARY KEY,
    code        TEXT NOT NULL,
    section     TEXT NOT NULL,
    block       TEXT NOT NULL,
    area_id     TEXT,
    role_id     TEXT NOT NULL,
    text        TEXT NOT NULL,
    type        TEXT NOT NULL,
    options     TEXT NOT NULL,
    scoring_map TEXT NOT NULL,
    position    INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_questions_role_id ON questions(role_id);

CREATE TABLE IF NOT EXISTS submissions (
    id              TEXT PRIMARY KEY,
    role_id         TEXT NOT NULL,
    adoption_score  REAL NOT NULL,
    knowledge_score REAL NOT NULL,
    total_score     REAL NOT NULL,
    classification  TEXT NOT NULL,
    submitted_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS responses (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    submission_id TEXT NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
    question_id   TEXT NOT NULL,
    answer        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_responses_submission ON responses(submission_id);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
        Migration {
            version: SEARCH_TEXT_VERSION,
            description: "Unicode-folded search_text on every content table",
            sql: r#"
ALTER TABLE glossary_terms ADD COLUMN search_text TEXT NOT NULL DEFAULT '';
ALTER TABLE faqs ADD COLUMN search_text TEXT NOT NULL DEFAULT '';
ALTER TABLE courses ADD COLUMN search_text TEXT NOT NULL DEFAULT '';
ALTER TABLE modules ADD COLUMN search_text TEXT NOT NULL DEFAULT '';
ALTER TABLE activities ADD COLUMN search_text TEXT NOT NULL DEFAULT '';
ALTER TABLE quiz_questions ADD COLUMN search_text TEXT NOT NULL DEFAULT '';

INSERT INTO schema_migrations (version) VALUES (3);
"#,
        },
    ]
}
