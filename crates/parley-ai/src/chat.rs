//! Plain chat and chat with conversational memory

use anyhow::Result;
use parley_core::{ChatMessage, ChatPromptTemplate, PromptValues};
use parley_history::{ChatHistory, ConversationMemory};
use tracing::info;

use crate::model::ChatModel;

/// Stateless chat: every call sends a single human message
pub struct Chatbot<M> {
    model: M,
}

impl<M: ChatModel> Chatbot<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub async fn ask(&self, content: &str) -> Result<String> {
        self.model.invoke(&[ChatMessage::human(content)]).await
    }
}

/// Chat that replays past turns from memory before each new message
pub struct ConversationChain<M, H> {
    model: M,
    memory: ConversationMemory<H>,
    prompt: ChatPromptTemplate,
}

impl<M: ChatModel, H: ChatHistory> ConversationChain<M, H> {
    pub fn new(model: M, memory: ConversationMemory<H>) -> Self {
        let prompt = ChatPromptTemplate::new()
            .placeholder(memory.memory_key())
            .human("{content}");
        Self {
            model,
            memory,
            prompt,
        }
    }

    /// Prepend a system instruction to every request
    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.prompt = ChatPromptTemplate::new()
            .system(system)
            .placeholder(self.memory.memory_key())
            .human("{content}");
        self
    }

    pub fn memory(&self) -> &ConversationMemory<H> {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut ConversationMemory<H> {
        &mut self.memory
    }

    /// Send one message; the exchange is saved only after a successful reply
    pub async fn send(&mut self, content: &str) -> Result<String> {
        let history = self.memory.load_messages()?;
        let turns = history.len() / 2;
        let values = PromptValues::new()
            .with("content", content)
            .with_messages(self.memory.memory_key(), history);
        let messages = self.prompt.format_messages(&values)?;

        info!(
            "Sending message with {} prior exchanges to {}",
            turns,
            self.model.model_name()
        );
        let reply = self.model.invoke(&messages).await?;

        self.memory.save_context(content, &reply)?;
        Ok(reply)
    }
}
