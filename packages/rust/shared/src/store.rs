//! Collaborator interfaces the core consumes.
//!
//! Handles are injected by the caller; the core never opens its own
//! connection. Production implementations live in `aitutor-storage`,
//! tests use in-memory fakes.

use crate::error::Result;
use crate::types::{Question, RawRow, SourceKind, Submission};

/// Read-only access to the six chatbot content sources.
#[allow(async_fn_in_trait)]
pub trait ContentStore {
    /// Return every row of `source` whose searchable text contains `pattern`.
    ///
    /// `pattern` is a SQL `LIKE` pattern (`%term%`, lower case, `\` escapes).
    /// Each returned row carries its relevance score.
    async fn fetch_source(&self, source: SourceKind, pattern: &str) -> Result<Vec<RawRow>>;
}

/// Source of questionnaire questions.
#[allow(async_fn_in_trait)]
pub trait QuestionSource {
    /// Questions for a role, already filtered to that role.
    async fn questions_by_role(&self, role_id: &str) -> Result<Vec<Question>>;
}

/// Destination for scored submissions.
#[allow(async_fn_in_trait)]
pub trait ResponseSink {
    /// Persist a submission and return its identifier.
    async fn record_submission(&self, submission: &Submission) -> Result<String>;
}
