//! Core domain logic for the AI tutor.
//!
//! - [`retrieval`] finds and ranks platform content for a learner question
//! - [`context`] turns ranked records into a bounded prompt block
//! - [`chat`] grounds an LLM answer on that block
//! - [`scoring`] and [`questionnaire`] score proficiency questionnaires
//!
//! Stores and LLM clients are injected; nothing here opens a connection.

pub mod chat;
pub mod context;
pub mod llm;
pub mod normalize;
pub mod questionnaire;
pub mod retrieval;
pub mod scoring;
