//! Shared types, error model, configuration and collaborator traits for the
//! AI tutor.
//!
//! This crate is the foundation depended on by all other tutor crates.
//! It provides:
//! - [`TutorError`]: the unified error type
//! - Domain types ([`ContentRecord`], [`RawRow`], [`Question`], [`ScoreResult`])
//! - Configuration ([`AppConfig`], [`ContextConfig`], config loading)
//! - Injected interfaces ([`ContentStore`], [`QuestionSource`], [`ResponseSink`])

pub mod config;
pub mod error;
pub mod store;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ContextConfig, ContextLimitsConfig, DefaultsConfig, OpenRouterConfig,
    ScoringConfig, UnknownQuestionPolicy, config_dir, config_file_path, expand_home, init_config,
    load_config, load_config_from, validate_api_key,
};
pub use error::{Result, TutorError};
pub use store::{ContentStore, QuestionSource, ResponseSink};
pub use types::{
    AnswerPair, Block, Classification, ContentRecord, LessonFields, Question, QuestionType,
    RawRow, RecordBody, Response, ScoreResult, ScoringMap, SourceKind, Submission,
    normalize_letter, parse_options,
};
