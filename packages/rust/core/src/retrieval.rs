//! Chatbot context retrieval.
//!
//! Fans a user question out to every content source on one injected store
//! handle, merges the hits, ranks them by relevance (desc) then source name
//! (asc), keeps the first [`MAX_CONTEXT_RECORDS`] and normalizes them.
//! There are no per-source quotas: one source may fill every slot.

use aitutor_shared::{ContentRecord, ContentStore, RawRow, Result, SourceKind, TutorError};
use tracing::{debug, info, instrument};

use crate::normalize::normalize;

/// Upper bound on records returned for one question.
pub const MAX_CONTEXT_RECORDS: usize = 12;

/// Trim and validate a user question.
pub fn validate_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(TutorError::invalid_input("question must not be empty"));
    }
    Ok(trimmed)
}

/// Build the case-insensitive substring pattern for a validated question.
///
/// Lowercased the same way as the stored `search_text` column.
/// `%`, `_` and `\` in the question are matched literally (`ESCAPE '\'`).
pub fn like_pattern(question: &str) -> String {
    let mut pattern = String::with_capacity(question.len() + 2);
    pattern.push('%');
    for c in question.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Sort merged rows and cut to [`MAX_CONTEXT_RECORDS`].
///
/// The sort is stable, so rows with equal keys keep store order.
pub fn rank(mut rows: Vec<RawRow>) -> Vec<RawRow> {
    rows.sort_by(|a, b| {
        b.relevance
            .cmp(&a.relevance)
            .then_with(|| a.source.cmp(&b.source))
    });
    rows.truncate(MAX_CONTEXT_RECORDS);
    rows
}

/// Retrieve the ranked, normalized context records for a question.
///
/// Fails with `InvalidInput` before touching the store when the question is
/// blank, and with `StoreUnavailable` if any source query fails. No partial
/// results and no retries.
#[instrument(skip_all, fields(question_len = question.len()))]
pub async fn search_context<S: ContentStore>(
    store: &S,
    question: &str,
) -> Result<Vec<ContentRecord>> {
    let question = validate_question(question)?;
    let pattern = like_pattern(question);

    let mut merged = Vec::new();
    for source in SourceKind::ALL {
        let rows = store.fetch_source(source, &pattern).await?;
        debug!(%source, hits = rows.len(), "source hits");
        merged.extend(rows);
    }

    let total_hits = merged.len();
    let records: Vec<ContentRecord> = rank(merged).into_iter().map(normalize).collect();

    info!(total_hits, returned = records.len(), "context retrieved");
    Ok(records)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    /// In-memory store returning canned rows per source and recording calls.
    #[derive(Default)]
    pub(crate) struct FakeStore {
        pub rows: HashMap<SourceKind, Vec<RawRow>>,
        pub fail_on: Option<SourceKind>,
        pub calls: RefCell<Vec<(SourceKind, String)>>,
    }

    impl FakeStore {
        pub(crate) fn with(mut self, source: SourceKind, rows: Vec<RawRow>) -> Self {
            self.rows.insert(source, rows);
            self
        }
    }

    impl ContentStore for FakeStore {
        async fn fetch_source(&self, source: SourceKind, pattern: &str) -> Result<Vec<RawRow>> {
            self.calls.borrow_mut().push((source, pattern.to_string()));
            if self.fail_on == Some(source) {
                return Err(TutorError::store("connection reset"));
            }
            Ok(self.rows.get(&source).cloned().unwrap_or_default())
        }
    }

    pub(crate) fn row(source: SourceKind, id: &str, relevance: i64) -> RawRow {
        RawRow {
            source: source.as_str().into(),
            id: id.into(),
            relevance,
            ..RawRow::default()
        }
    }

    #[test]
    fn blank_question_is_invalid() {
        assert!(matches!(
            validate_question("   \n"),
            Err(TutorError::InvalidInput { .. })
        ));
        assert_eq!(validate_question("  hi ").unwrap(), "hi");
    }

    #[test]
    fn like_pattern_lowercases_and_escapes() {
        assert_eq!(like_pattern("Machine Learning"), "%machine learning%");
        assert_eq!(like_pattern("100%_done\\"), "%100\\%\\_done\\\\%");
    }

    #[test]
    fn rank_breaks_ties_by_source_name() {
        let ranked = rank(vec![
            row(SourceKind::Glossary, "g", 10),
            row(SourceKind::Course, "c", 10),
            row(SourceKind::Activity, "a", 10),
            row(SourceKind::Faq, "f", 30),
        ]);
        let order: Vec<&str> = ranked.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(order, vec!["faq", "activity", "course", "glossary"]);
    }

    #[test]
    fn rank_is_stable_within_equal_keys() {
        let ranked = rank(vec![
            row(SourceKind::Module, "m2", 5),
            row(SourceKind::Module, "m1", 5),
        ]);
        assert_eq!(ranked[0].id, "m2");
        assert_eq!(ranked[1].id, "m1");
    }

    #[tokio::test]
    async fn empty_store_returns_empty_list() {
        let store = FakeStore::default();
        let records = search_context(&store, "anything").await.expect("search");
        assert!(records.is_empty());
        assert_eq!(store.calls.borrow().len(), 6);
    }

    #[tokio::test]
    async fn blank_question_never_reaches_store() {
        let store = FakeStore::default();
        let err = search_context(&store, "  ").await.unwrap_err();
        assert!(matches!(err, TutorError::InvalidInput { .. }));
        assert!(store.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn every_source_gets_the_same_pattern() {
        let store = FakeStore::default();
        search_context(&store, " Prompt Design ").await.expect("search");
        let calls = store.calls.borrow();
        let sources: Vec<SourceKind> = calls.iter().map(|(s, _)| *s).collect();
        assert_eq!(sources, SourceKind::ALL.to_vec());
        assert!(calls.iter().all(|(_, p)| p == "%prompt design%"));
    }

    #[tokio::test]
    async fn results_are_capped_and_one_source_may_dominate() {
        let glossary: Vec<RawRow> = (0..20)
            .map(|i| row(SourceKind::Glossary, &format!("g{i}"), 100 + i))
            .collect();
        let store = FakeStore::default()
            .with(SourceKind::Glossary, glossary)
            .with(SourceKind::Faq, vec![row(SourceKind::Faq, "f1", 1)]);

        let records = search_context(&store, "term").await.expect("search");
        assert_eq!(records.len(), MAX_CONTEXT_RECORDS);
        assert!(records.iter().all(|r| r.source() == "glossary"));
        assert_eq!(records[0].id, "g19");
    }

    #[tokio::test]
    async fn store_failure_returns_no_partial_results() {
        let store = FakeStore {
            fail_on: Some(SourceKind::Module),
            ..FakeStore::default()
        }
        .with(SourceKind::Glossary, vec![row(SourceKind::Glossary, "g1", 3)]);

        let err = search_context(&store, "networks").await.unwrap_err();
        assert!(matches!(err, TutorError::StoreUnavailable(_)));
        // Glossary, faq, course, module; nothing after the failure.
        assert_eq!(store.calls.borrow().len(), 4);
    }

    #[tokio::test]
    async fn faq_with_priority_outranks_glossary_term() {
        let mut glossary = row(SourceKind::Glossary, "g1", 16);
        glossary.term = Some("Machine Learning".into());
        let mut faq = row(SourceKind::Faq, "f1", 80);
        faq.question = Some("What is machine learning?".into());

        let store = FakeStore::default()
            .with(SourceKind::Glossary, vec![glossary])
            .with(SourceKind::Faq, vec![faq]);

        let records = search_context(&store, "machine learning").await.expect("search");
        let order: Vec<&str> = records.iter().map(|r| r.source()).collect();
        assert_eq!(order, vec!["faq", "glossary"]);
    }

    #[tokio::test]
    async fn libsql_store_end_to_end() {
        use aitutor_storage::{ContentBundle, Storage};

        let tmp = std::env::temp_dir().join(format!(
            "aitutor_retrieval_{}.db",
            uuid::Uuid::now_v7()
        ));
        let storage = Storage::open(&tmp).await.expect("open");

        // 80-char definition; FAQ text is 20 + 20 chars at priority 2.
        let definition = "x".repeat(80);
        let bundle: ContentBundle = serde_json::from_value(serde_json::json!({
            "glossary": [{"id": "g1", "term": "Machine Learning", "definition": definition}],
            "faqs": [{
                "id": "f1",
                "question": "Machine learning is?",
                "answer": "Learning from data..",
                "priority": 2
            }],
            "courses": [{"id": "c1", "name": "Cooking basics"}]
        }))
        .expect("bundle");
        storage.import_bundle(&bundle).await.expect("import");

        let records = search_context(&storage, "machine learning").await.expect("search");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source(), "faq");
        assert_eq!(records[1].source(), "glossary");

        let json = serde_json::to_value(&records[1]).expect("serialize");
        assert_eq!(json["term"], "Machine Learning");
        assert!(json.get("question").is_none());
    }
}
