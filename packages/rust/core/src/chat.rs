//! Tutor chat: retrieve context for a question and ask the LLM.

use aitutor_shared::{ContentRecord, ContentStore, ContextConfig, Result};
use serde::Serialize;
use tracing::{info, instrument};

use crate::context::{assemble_context, truncate_chars};
use crate::llm::{ChatMessage, LlmClient};
use crate::retrieval::search_context;

/// Cap on the optional style/examples block.
pub const MAX_STYLE_CHARS: usize = 4000;

const SYSTEM_PREAMBLE: &str = "You are an AI tutor for an online learning platform. \
Answer the learner's question clearly and concisely. Prefer the platform content \
below when it is relevant and say so when it does not cover the question.";

/// One question plus the conversation so far.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub question: String,
    /// Prior turns, oldest first.
    pub history: Vec<ChatMessage>,
    /// Tone or worked examples to imitate.
    pub style: Option<String>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
    /// Records the answer was grounded on, in rank order.
    pub sources: Vec<ContentRecord>,
}

/// Render the system prompt around an assembled context block.
pub fn system_prompt(context: &str, style: Option<&str>) -> String {
    let mut prompt = String::from(SYSTEM_PREAMBLE);

    if let Some(style) = style.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n\n## Style and examples\n");
        prompt.push_str(&truncate_chars(style, MAX_STYLE_CHARS));
    }

    prompt.push_str("\n\n## Platform content\n");
    if context.is_empty() {
        prompt.push_str("(no matching content)");
    } else {
        prompt.push_str(context);
    }
    prompt
}

/// System prompt, then history, then the user's question.
pub fn build_messages(context: &str, request: &ChatRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    messages.push(ChatMessage::system(system_prompt(
        context,
        request.style.as_deref(),
    )));
    messages.extend(request.history.iter().cloned());
    messages.push(ChatMessage::user(request.question.trim()));
    messages
}

/// Answer a learner question grounded on retrieved platform content.
///
/// Retrieval errors (blank question, store failure) abort before the LLM is
/// called.
#[instrument(skip_all, fields(history = request.history.len()))]
pub async fn answer_question<S: ContentStore, L: LlmClient>(
    store: &S,
    llm: &L,
    config: &ContextConfig,
    request: &ChatRequest,
) -> Result<ChatAnswer> {
    let sources = search_context(store, &request.question).await?;
    let context = assemble_context(&sources, config);
    let messages = build_messages(&context, request);

    let answer = llm.complete(&messages).await?;
    info!(
        sources = sources.len(),
        context_chars = context.chars().count(),
        "question answered"
    );

    Ok(ChatAnswer { answer, sources })
}
