use async_trait::async_trait;

use crate::agent::{Agent, AgentInput, AgentLegion};
use crate::domain::llm::{LlmStream, Message, Response};
use crate::domain::LlmError;
use crate::infrastructure::llm::Llm;

#[cfg(test)]
use mockall::automock;

/// Anything that can answer a conversation
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConversationClient: Send + Sync {
    /// Reply to the conversation so far
    async fn reply(&self, messages: Vec<Message>) -> Result<Response, LlmError>;

    /// Stream the reply to the conversation so far
    async fn reply_stream(&self, messages: Vec<Message>) -> Result<LlmStream, LlmError>;
}

#[async_trait]
impl ConversationClient for Llm {
    async fn reply(&self, messages: Vec<Message>) -> Result<Response, LlmError> {
        self.chat_async(messages).await
    }

    async fn reply_stream(&self, messages: Vec<Message>) -> Result<LlmStream, LlmError> {
        self.stream_async(messages).await
    }
}

#[async_trait]
impl ConversationClient for Agent {
    async fn reply(&self, messages: Vec<Message>) -> Result<Response, LlmError> {
        self.work_async(messages).await
    }

    async fn reply_stream(&self, messages: Vec<Message>) -> Result<LlmStream, LlmError> {
        self.stream_async(messages).await
    }
}

#[async_trait]
impl ConversationClient for AgentLegion {
    async fn reply(&self, messages: Vec<Message>) -> Result<Response, LlmError> {
        self.work_async(AgentInput::from(messages)).await
    }

    async fn reply_stream(&self, messages: Vec<Message>) -> Result<LlmStream, LlmError> {
        self.stream_async(AgentInput::from(messages)).await
    }
}
