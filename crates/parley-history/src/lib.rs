//! Parley History - conversation transcripts
//!
//! This crate provides storage and retrieval for chat turns:
//! - The on-disk JSON transcript format
//! - A file-backed store that rewrites the whole file on every append
//! - Buffer memory that feeds past turns back into a prompt

pub mod memory;
pub mod schema;
pub mod store;

pub use memory::ConversationMemory;
pub use schema::{StoredMessage, StoredMessageData};
pub use store::{ChatHistory, FileChatHistory, HistoryError, InMemoryChatHistory};
