//! Buffer memory over a transcript

use parley_core::ChatMessage;
use tracing::debug;

use crate::store::{ChatHistory, HistoryError};

/// Feeds past turns back into a prompt and records new ones.
#[derive(Debug, Clone)]
pub struct ConversationMemory<H> {
    history: H,
    memory_key: String,
    /// Keep only the last `k` human/ai exchanges when loading
    window: Option<usize>,
}

impl<H: ChatHistory> ConversationMemory<H> {
    pub fn new(history: H) -> Self {
        Self {
            history,
            memory_key: "messages".to_string(),
            window: None,
        }
    }

    /// Name of the prompt placeholder the loaded messages fill
    pub fn with_memory_key(mut self, key: impl Into<String>) -> Self {
        self.memory_key = key.into();
        self
    }

    pub fn with_window(mut self, exchanges: usize) -> Self {
        self.window = Some(exchanges);
        self
    }

    pub fn memory_key(&self) -> &str {
        &self.memory_key
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn load_messages(&self) -> Result<Vec<ChatMessage>, HistoryError> {
        let mut messages = self.history.messages()?;
        if let Some(k) = self.window {
            let keep = k.saturating_mul(2);
            if messages.len() > keep {
                messages.drain(..messages.len() - keep);
            }
        }
        Ok(messages)
    }

    /// Record one exchange: the human input followed by the model output
    pub fn save_context(&mut self, input: &str, output: &str) -> Result<(), HistoryError> {
        self.history
            .add_messages(&[ChatMessage::human(input), ChatMessage::ai(output)])?;
        debug!("Saved exchange to memory '{}'", self.memory_key);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), HistoryError> {
        self.history.clear()
    }
}
