//! Parley AI - model invocation and structured-output pipelines
//!
//! This crate provides:
//! - LLM API client (Gemini/OpenAI/Anthropic) behind the `ChatModel` trait
//! - Output parsers that decode model text into schema-checked JSON
//! - Pipelines: chat with file-backed memory, key data extraction,
//!   tagging, and question answering over a SQLite database

pub mod chat;
pub mod client;
pub mod extraction;
pub mod model;
pub mod output;
pub mod sql_chain;
pub mod tagging;

pub use chat::{Chatbot, ConversationChain};
pub use client::{LlmClient, LlmProvider};
pub use extraction::ExtractionChain;
pub use model::ChatModel;
pub use output::{JsonOutputParser, OutputParserError};
pub use sql_chain::{SqlAnswer, SqlQueryChain};
pub use tagging::TaggingChain;
