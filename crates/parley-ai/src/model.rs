//! The model invocation seam

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parley_core::ChatMessage;

/// Anything that turns a message list into reply text
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String>;

    fn model_name(&self) -> &str;
}

#[async_trait]
impl<M: ChatModel + ?Sized> ChatModel for &M {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        (**self).invoke(messages).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

#[async_trait]
impl<M: ChatModel + ?Sized> ChatModel for Arc<M> {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        (**self).invoke(messages).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
