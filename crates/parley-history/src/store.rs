//! Transcript store implementations

use std::fs;
use std::path::{Path, PathBuf};

use parley_core::ChatMessage;
use thiserror::Error;
use tracing::{debug, info};

use crate::schema::StoredMessage;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error on history file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history file {path:?} is not a valid transcript: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// An ordered sequence of chat turns
pub trait ChatHistory {
    /// All messages in turn order
    fn messages(&self) -> Result<Vec<ChatMessage>, HistoryError>;

    /// Append several messages in order
    fn add_messages(&mut self, messages: &[ChatMessage]) -> Result<(), HistoryError>;

    /// Remove every message
    fn clear(&mut self) -> Result<(), HistoryError>;

    fn add_message(&mut self, message: &ChatMessage) -> Result<(), HistoryError> {
        self.add_messages(std::slice::from_ref(message))
    }
}

/// Transcript stored as a flat JSON array on disk.
///
/// Every append reads the whole file and writes it back. Nothing guards
/// against two writers sharing the same path.
#[derive(Debug, Clone)]
pub struct FileChatHistory {
    path: PathBuf,
}

impl FileChatHistory {
    /// Open the transcript at `path`, creating an empty one if missing
    pub fn new(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| HistoryError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            let history = Self { path };
            history.write(&[])?;
            info!("Created history file at {:?}", history.path);
            return Ok(history);
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<StoredMessage>, HistoryError> {
        let content = fs::read_to_string(&self.path).map_err(|source| HistoryError::Io {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|source| HistoryError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, messages: &[StoredMessage]) -> Result<(), HistoryError> {
        let json = serde_json::to_string_pretty(messages).map_err(|source| {
            HistoryError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, json).map_err(|source| HistoryError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl ChatHistory for FileChatHistory {
    fn messages(&self) -> Result<Vec<ChatMessage>, HistoryError> {
        let stored = self.read()?;
        debug!("Loaded {} messages from {:?}", stored.len(), self.path);
        Ok(stored.into_iter().map(ChatMessage::from).collect())
    }

    fn add_messages(&mut self, messages: &[ChatMessage]) -> Result<(), HistoryError> {
        let mut stored = self.read()?;
        stored.extend(messages.iter().map(StoredMessage::from));
        self.write(&stored)?;
        debug!(
            "Appended {} messages to {:?} ({} total)",
            messages.len(),
            self.path,
            stored.len()
        );
        Ok(())
    }

    fn clear(&mut self) -> Result<(), HistoryError> {
        self.write(&[])
    }
}

/// Transcript kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryChatHistory {
    messages: Vec<ChatMessage>,
}

impl InMemoryChatHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatHistory for InMemoryChatHistory {
    fn messages(&self) -> Result<Vec<ChatMessage>, HistoryError> {
        Ok(self.messages.clone())
    }

    fn add_messages(&mut self, messages: &[ChatMessage]) -> Result<(), HistoryError> {
        self.messages.extend_from_slice(messages);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), HistoryError> {
        self.messages.clear();
        Ok(())
    }
}
