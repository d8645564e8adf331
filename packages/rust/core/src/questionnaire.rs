//! Questionnaire sessions: collect answers, score them, persist the result.

use std::collections::BTreeMap;

use aitutor_shared::{
    AnswerPair, QuestionSource, Response, ResponseSink, Result, ScoreResult, Submission,
    TutorError, UnknownQuestionPolicy,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::scoring::score_responses;

/// Answers keyed by question id. Selecting again replaces the earlier answer.
#[derive(Debug, Clone, Default)]
pub struct ResponseSheet {
    answers: BTreeMap<String, Response>,
}

impl ResponseSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer now.
    pub fn select(&mut self, question_id: impl Into<String>, answer: impl Into<String>) {
        self.insert(Response {
            question_id: question_id.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
        });
    }

    /// Record a pre-built response; the latest one per question wins.
    pub fn insert(&mut self, response: Response) {
        self.answers.insert(response.question_id.clone(), response);
    }

    pub fn responses(&self) -> Vec<Response> {
        self.answers.values().cloned().collect()
    }

    /// `{question_id, answer}` pairs in question id order.
    pub fn answers(&self) -> Vec<AnswerPair> {
        self.answers
            .values()
            .map(|r| AnswerPair {
                question_id: r.question_id.clone(),
                answer: r.answer.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

impl FromIterator<Response> for ResponseSheet {
    fn from_iter<I: IntoIterator<Item = Response>>(iter: I) -> Self {
        let mut sheet = Self::new();
        for response in iter {
            sheet.insert(response);
        }
        sheet
    }
}

/// Result of a persisted submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionOutcome {
    pub submission_id: String,
    pub score: ScoreResult,
    pub submitted_at: DateTime<Utc>,
}

fn validate_role(role_id: &str) -> Result<&str> {
    let role_id = role_id.trim();
    if role_id.is_empty() {
        return Err(TutorError::invalid_input("role must not be empty"));
    }
    Ok(role_id)
}

/// Load the role's questions and score the sheet against them.
#[instrument(skip_all, fields(role_id = %role_id, answers = sheet.len()))]
pub async fn score_sheet<Q: QuestionSource>(
    source: &Q,
    role_id: &str,
    sheet: &ResponseSheet,
    policy: UnknownQuestionPolicy,
) -> Result<ScoreResult> {
    let role_id = validate_role(role_id)?;
    let questions = source.questions_by_role(role_id).await?;
    score_responses(&questions, &sheet.responses(), policy)
}

/// Score a sheet and hand it to the response sink.
#[instrument(skip_all, fields(role_id = %role_id, answers = sheet.len()))]
pub async fn submit<Q: QuestionSource, R: ResponseSink>(
    source: &Q,
    sink: &R,
    role_id: &str,
    sheet: &ResponseSheet,
    policy: UnknownQuestionPolicy,
) -> Result<SubmissionOutcome> {
    let score = score_sheet(source, role_id, sheet, policy).await?;

    let submission = Submission {
        role_id: role_id.trim().to_string(),
        answers: sheet.answers(),
        score,
        submitted_at: Utc::now(),
    };
    let submission_id = sink.record_submission(&submission).await?;

    info!(
        %submission_id,
        total_score = score.total_score,
        classification = score.classification.as_str(),
        "submission recorded"
    );

    Ok(SubmissionOutcome {
        submission_id,
        score,
        submitted_at: submission.submitted_at,
    })
}
