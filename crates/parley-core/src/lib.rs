//! Parley Core - chat messages and prompt templates
//!
//! This crate provides the input-assembly stage shared by every pipeline:
//! - Chat messages tagged by role
//! - Single-text and multi-message prompt templates with `{variable}` slots

pub mod message;
pub mod prompt;

pub use message::{ChatMessage, Role};
pub use prompt::{ChatPromptTemplate, PromptError, PromptTemplate, PromptValues};
