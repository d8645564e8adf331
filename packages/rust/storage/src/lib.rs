//! Turso Embedded / libSQL storage layer.
//!
//! The [`Storage`] struct wraps a libSQL database holding the chatbot
//! content sources, the questionnaire bank and scored submissions. It is the
//! production implementation of [`ContentStore`], [`QuestionSource`] and
//! [`ResponseSink`].
//!
//! **Access rules:**
//! - `import` and quiz submission: read-write via [`Storage::open`]
//! - chatbot lookups: read-only via [`Storage::open_readonly`]

mod migrations;
pub mod queries;
pub mod records;

use std::path::Path;

use aitutor_shared::{
    AnswerPair, Block, Classification, ContentStore, Question, QuestionSource, QuestionType,
    RawRow, ResponseSink, Result, ScoreResult, ScoringMap, SourceKind, Submission, TutorError,
    parse_options,
};
use libsql::{Connection, Database, params};
use tracing::{debug, warn};
use uuid::Uuid;

pub use records::{
    Activity, ContentBundle, Course, Faq, GlossaryTerm, ImportStats, Module, QuestionRow, Quiz,
    QuizQuestion,
};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TutorError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(TutorError::store)?;

        let conn = db.connect().map_err(TutorError::store)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TutorError::StoreUnavailable(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(TutorError::store)?;

        let conn = db.connect().map_err(TutorError::store)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        TutorError::StoreUnavailable(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;

                if migration.version == migrations::SEARCH_TEXT_VERSION {
                    self.rebuild_search_text().await?;
                }
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(TutorError::validation("database is opened in read-only mode"));
        }
        Ok(())
    }

    /// Recompute `search_text` for every content row. Returns the rows touched.
    pub async fn rebuild_search_text(&self) -> Result<usize> {
        self.check_writable()?;
        let mut touched = 0;

        for (table, columns) in queries::SEARCH_COLUMNS {
            let sql = format!("SELECT id, {} FROM {table}", columns.join(", "));
            let mut rows = self
                .conn
                .query(&sql, params![])
                .await
                .map_err(TutorError::store)?;

            let mut updates = Vec::new();
            while let Some(row) = rows.next().await.map_err(TutorError::store)? {
                let id: String = row.get(0).map_err(TutorError::store)?;
                let mut fields = Vec::with_capacity(columns.len());
                for idx in 1..=columns.len() {
                    fields.push(row.get::<Option<String>>(idx as i32).map_err(TutorError::store)?);
                }
                updates.push((id, queries::search_text(fields.iter().map(|f| f.as_deref()))));
            }
            drop(rows);

            let update = format!("UPDATE {table} SET search_text = ?1 WHERE id = ?2");
            for (id, text) in &updates {
                self.conn
                    .execute(&update, params![text.as_str(), id.as_str()])
                    .await
                    .map_err(TutorError::store)?;
            }
            debug!(table, rows = updates.len(), "search_text rebuilt");
            touched += updates.len();
        }
        Ok(touched)
    }

    // -----------------------------------------------------------------------
    // Content writes
    // -----------------------------------------------------------------------

    pub async fn insert_glossary_term(&self, term: &GlossaryTerm) -> Result<()> {
        self.check_writable()?;
        write_glossary_term(&self.conn, term).await
    }

    pub async fn insert_faq(&self, faq: &Faq) -> Result<()> {
        self.check_writable()?;
        write_faq(&self.conn, faq).await
    }

    pub async fn insert_course(&self, course: &Course) -> Result<()> {
        self.check_writable()?;
        write_course(&self.conn, course).await
    }

    pub async fn insert_module(&self, module: &Module) -> Result<()> {
        self.check_writable()?;
        write_module(&self.conn, module).await
    }

    pub async fn insert_activity(&self, activity: &Activity) -> Result<()> {
        self.check_writable()?;
        write_activity(&self.conn, activity).await
    }

    pub async fn insert_quiz(&self, quiz: &Quiz) -> Result<()> {
        self.check_writable()?;
        write_quiz(&self.conn, quiz).await
    }

    pub async fn insert_quiz_question(&self, question: &QuizQuestion) -> Result<()> {
        self.check_writable()?;
        write_quiz_question(&self.conn, question).await
    }

    /// Insert a questionnaire question. The scoring map is stored verbatim.
    pub async fn insert_question(&self, question: &QuestionRow) -> Result<()> {
        self.check_writable()?;
        write_question(&self.conn, question).await
    }

    /// Load a whole bundle in one transaction. Parents are written before
    /// children; any failure rolls the whole bundle back.
    pub async fn import_bundle(&self, bundle: &ContentBundle) -> Result<ImportStats> {
        self.check_writable()?;

        let tx = self.conn.transaction().await.map_err(TutorError::store)?;
        let stats = match write_bundle(&tx, bundle).await {
            Ok(stats) => stats,
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback of failed import failed");
                }
                return Err(e);
            }
        };
        tx.commit().await.map_err(TutorError::store)?;

        tracing::info!(
            content_rows = stats.content_rows,
            questions = stats.questions,
            "bundle imported"
        );
        Ok(stats)
    }

    // -----------------------------------------------------------------------
    // Submission reads
    // -----------------------------------------------------------------------

    /// Role and score of a stored submission.
    pub async fn get_submission(&self, id: &str) -> Result<Option<(String, ScoreResult)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT role_id, adoption_score, knowledge_score, total_score, classification
                 FROM submissions WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(TutorError::store)?;

        let Some(row) = rows.next().await.map_err(TutorError::store)? else {
            return Ok(None);
        };

        let role_id: String = row.get(0).map_err(TutorError::store)?;
        let classification: String = row.get(4).map_err(TutorError::store)?;
        let classification = match classification.as_str() {
            "Basic" => Classification::Basic,
            "Intermediate" => Classification::Intermediate,
            "Advanced" => Classification::Advanced,
            other => {
                return Err(TutorError::validation(format!(
                    "stored classification '{other}' is not recognized"
                )));
            }
        };

        Ok(Some((
            role_id,
            ScoreResult {
                adoption_score: row.get(1).map_err(TutorError::store)?,
                knowledge_score: row.get(2).map_err(TutorError::store)?,
                total_score: row.get(3).map_err(TutorError::store)?,
                classification,
            },
        )))
    }

    /// Answers stored for a submission, in insertion order.
    pub async fn list_responses(&self, submission_id: &str) -> Result<Vec<AnswerPair>> {
        let mut rows = self
            .conn
            .query(
                "SELECT question_id, answer FROM responses WHERE submission_id = ?1 ORDER BY id",
                params![submission_id],
            )
            .await
            .map_err(TutorError::store)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(TutorError::store)? {
            results.push(AnswerPair {
                question_id: row.get(0).map_err(TutorError::store)?,
                answer: row.get(1).map_err(TutorError::store)?,
            });
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Collaborator trait implementations
// ---------------------------------------------------------------------------

impl ContentStore for Storage {
    async fn fetch_source(&self, source: SourceKind, pattern: &str) -> Result<Vec<RawRow>> {
        let mut rows = self
            .conn
            .query(queries::source_query(source), params![pattern])
            .await
            .map_err(TutorError::store)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(TutorError::store)? {
            results.push(row_to_raw(&row)?);
        }
        debug!(%source, hits = results.len(), "source scanned");
        Ok(results)
    }
}

impl QuestionSource for Storage {
    async fn questions_by_role(&self, role_id: &str) -> Result<Vec<Question>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, code, section, block, area_id, role_id, text, type, options, scoring_map
                 FROM questions WHERE role_id = ?1 ORDER BY position, code",
                params![role_id],
            )
            .await
            .map_err(TutorError::store)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(TutorError::store)? {
            if let Some(question) = row_to_question(&row)? {
                results.push(question);
            }
        }
        Ok(results)
    }
}

impl ResponseSink for Storage {
    async fn record_submission(&self, submission: &Submission) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let score = &submission.score;

        let tx = self.conn.transaction().await.map_err(TutorError::store)?;
        tx.execute(
            "INSERT INTO submissions
               (id, role_id, adoption_score, knowledge_score, total_score, classification, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.as_str(),
                submission.role_id.as_str(),
                score.adoption_score,
                score.knowledge_score,
                score.total_score,
                score.classification.as_str(),
                submission.submitted_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(TutorError::store)?;

        for pair in &submission.answers {
            tx.execute(
                "INSERT INTO responses (submission_id, question_id, answer) VALUES (?1, ?2, ?3)",
                params![id.as_str(), pair.question_id.as_str(), pair.answer.as_str()],
            )
            .await
            .map_err(TutorError::store)?;
        }
        tx.commit().await.map_err(TutorError::store)?;

        tracing::info!(
            submission_id = %id,
            answers = submission.answers.len(),
            classification = score.classification.as_str(),
            "submission recorded"
        );
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Row writers (shared by single inserts and transactional imports)
// ---------------------------------------------------------------------------

async fn write_glossary_term(conn: &Connection, term: &GlossaryTerm) -> Result<()> {
    let search = queries::search_text([Some(term.term.as_str()), term.definition.as_deref()]);
    conn.execute(
        "INSERT OR REPLACE INTO glossary_terms (id, term, definition, category, search_text)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            term.id.as_str(),
            term.term.as_str(),
            term.definition.as_deref(),
            term.category.as_deref(),
            search,
        ],
    )
    .await
    .map_err(TutorError::store)?;
    Ok(())
}

async fn write_faq(conn: &Connection, faq: &Faq) -> Result<()> {
    if faq.priority < 0 {
        return Err(TutorError::validation(format!(
            "faq {} has negative priority {}",
            faq.id, faq.priority
        )));
    }
    let search = queries::search_text([Some(faq.question.as_str()), faq.answer.as_deref()]);
    conn.execute(
        "INSERT OR REPLACE INTO faqs (id, question, answer, category, priority, course_id, search_text)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            faq.id.as_str(),
            faq.question.as_str(),
            faq.answer.as_deref(),
            faq.category.as_deref(),
            faq.priority,
            faq.course_id.as_deref(),
            search,
        ],
    )
    .await
    .map_err(TutorError::store)?;
    Ok(())
}

async fn write_course(conn: &Connection, course: &Course) -> Result<()> {
    let search = queries::search_text([
        Some(course.name.as_str()),
        course.short_description.as_deref(),
        course.long_description.as_deref(),
    ]);
    conn.execute(
        "INSERT OR REPLACE INTO courses
           (id, name, short_description, long_description, category, search_text)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            course.id.as_str(),
            course.name.as_str(),
            course.short_description.as_deref(),
            course.long_description.as_deref(),
            course.category.as_deref(),
            search,
        ],
    )
    .await
    .map_err(TutorError::store)?;
    Ok(())
}

async fn write_module(conn: &Connection, module: &Module) -> Result<()> {
    let search = queries::search_text([
        Some(module.title.as_str()),
        module.description.as_deref(),
        module.ai_feedback.as_deref(),
    ]);
    conn.execute(
        "INSERT OR REPLACE INTO modules (id, course_id, title, description, ai_feedback, search_text)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            module.id.as_str(),
            module.course_id.as_deref(),
            module.title.as_str(),
            module.description.as_deref(),
            module.ai_feedback.as_deref(),
            search,
        ],
    )
    .await
    .map_err(TutorError::store)?;
    Ok(())
}

async fn write_activity(conn: &Connection, activity: &Activity) -> Result<()> {
    let search = queries::search_text([
        activity.activity_type.as_deref(),
        activity.content_type.as_deref(),
        activity.resource_url.as_deref(),
        activity.ai_feedback.as_deref(),
    ]);
    conn.execute(
        "INSERT OR REPLACE INTO activities
           (id, module_id, type, content_type, resource_url, ai_feedback, search_text)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            activity.id.as_str(),
            activity.module_id.as_deref(),
            activity.activity_type.as_deref(),
            activity.content_type.as_deref(),
            activity.resource_url.as_deref(),
            activity.ai_feedback.as_deref(),
            search,
        ],
    )
    .await
    .map_err(TutorError::store)?;
    Ok(())
}

async fn write_quiz(conn: &Connection, quiz: &Quiz) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO quizzes (id, title, module_id, course_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            quiz.id.as_str(),
            quiz.title.as_str(),
            quiz.module_id.as_deref(),
            quiz.course_id.as_deref(),
        ],
    )
    .await
    .map_err(TutorError::store)?;
    Ok(())
}

async fn write_quiz_question(conn: &Connection, question: &QuizQuestion) -> Result<()> {
    let options = serde_json::to_string(&question.options)
        .map_err(|e| TutorError::validation(format!("quiz question options: {e}")))?;
    let search = queries::search_text([
        Some(question.question_text.as_str()),
        question.correct_answer.as_deref(),
        Some(options.as_str()),
    ]);
    conn.execute(
        "INSERT OR REPLACE INTO quiz_questions
           (id, quiz_id, question_text, correct_answer, options, search_text)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            question.id.as_str(),
            question.quiz_id.as_deref(),
            question.question_text.as_str(),
            question.correct_answer.as_deref(),
            options,
            search,
        ],
    )
    .await
    .map_err(TutorError::store)?;
    Ok(())
}

async fn write_question(conn: &Connection, question: &QuestionRow) -> Result<()> {
    let options = serde_json::to_string(&question.options)
        .map_err(|e| TutorError::validation(format!("question options: {e}")))?;
    conn.execute(
        "INSERT OR REPLACE INTO questions
           (id, code, section, block, area_id, role_id, text, type, options, scoring_map, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            question.id.as_str(),
            question.code.as_str(),
            question.section.as_str(),
            question.block.as_str(),
            question.area_id.as_deref(),
            question.role_id.as_str(),
            question.text.as_str(),
            question.question_type.as_str(),
            options,
            question.scoring_map.to_string(),
            question.position,
        ],
    )
    .await
    .map_err(TutorError::store)?;
    Ok(())
}

async fn write_bundle(conn: &Connection, bundle: &ContentBundle) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    for course in &bundle.courses {
        write_course(conn, course).await?;
        stats.content_rows += 1;
    }
    for module in &bundle.modules {
        write_module(conn, module).await?;
        stats.content_rows += 1;
    }
    for activity in &bundle.activities {
        write_activity(conn, activity).await?;
        stats.content_rows += 1;
    }
    for quiz in &bundle.quizzes {
        write_quiz(conn, quiz).await?;
        stats.content_rows += 1;
    }
    for question in &bundle.quiz_questions {
        write_quiz_question(conn, question).await?;
        stats.content_rows += 1;
    }
    for term in &bundle.glossary {
        write_glossary_term(conn, term).await?;
        stats.content_rows += 1;
    }
    for faq in &bundle.faqs {
        write_faq(conn, faq).await?;
        stats.content_rows += 1;
    }
    for question in &bundle.questions {
        write_question(conn, question).await?;
        stats.questions += 1;
    }
    Ok(stats)
}

/// Convert a source-query row (see [`queries::COLUMNS`]) to a [`RawRow`].
///
/// Only SQL NULL becomes `None`; a value of the wrong type is a store error.
fn row_to_raw(row: &libsql::Row) -> Result<RawRow> {
    let text = |idx: i32| row.get::<Option<String>>(idx).map_err(TutorError::store);
    Ok(RawRow {
        source: row.get::<String>(0).map_err(TutorError::store)?,
        id: row.get::<String>(1).map_err(TutorError::store)?,
        course_id: text(2)?,
        module_id: text(3)?,
        category: text(4)?,
        term: text(5)?,
        definition: text(6)?,
        question: text(7)?,
        answer: text(8)?,
        title: text(9)?,
        description: text(10)?,
        content: text(11)?,
        relevance: row.get::<i64>(12).map_err(TutorError::store)?,
    })
}

/// Convert a `questions` row. Rows that cannot be scored are skipped with a warning.
fn row_to_question(row: &libsql::Row) -> Result<Option<Question>> {
    let id: String = row.get(0).map_err(TutorError::store)?;

    let block = match row.get::<String>(3).map_err(TutorError::store)?.parse::<Block>() {
        Ok(block) => block,
        Err(e) => {
            warn!(question_id = %id, error = %e, "skipping question with unknown block");
            return Ok(None);
        }
    };
    let question_type = match row
        .get::<String>(7)
        .map_err(TutorError::store)?
        .parse::<QuestionType>()
    {
        Ok(t) => t,
        Err(e) => {
            warn!(question_id = %id, error = %e, "skipping question with unknown type");
            return Ok(None);
        }
    };

    let raw_options: String = row.get(8).map_err(TutorError::store)?;
    let options = parse_options(&raw_options).unwrap_or_else(|e| {
        warn!(question_id = %id, error = %e, "question options are not a JSON array");
        Vec::new()
    });

    let raw_map: String = row.get(9).map_err(TutorError::store)?;
    let scoring_map = ScoringMap::parse(&raw_map);

    Ok(Some(Question {
        id,
        code: row.get(1).map_err(TutorError::store)?,
        section: row.get(2).map_err(TutorError::store)?,
        block,
        area_id: row.get::<Option<String>>(4).map_err(TutorError::store)?,
        role_id: row.get(5).map_err(TutorError::store)?,
        text: row.get(6).map_err(TutorError::store)?,
        question_type,
        options,
        scoring_map,
    }))
}
