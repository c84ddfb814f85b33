//! agentine
//!
//! A lightweight framework for chat-based AI agents on top of third-party LLM APIs:
//! - A provider-agnostic client with blocking, async, streaming and batch calls
//! - Agents that pair the client with an instruction and text or JSON output
//! - Multi-agent groups, indexes and selector-driven legions
//! - A line-based chat loop for interactive use

pub mod agent;
pub mod chatbot;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use agent::{template, Agent, AgentGroup, AgentIndex, AgentInput, AgentLegion};
pub use chatbot::{Chatbot, ChatbotOptions, ConversationClient};
pub use config::AppConfig;
pub use domain::{
    ContentPart, Dialect, FinishReason, LlmError, LlmRequest, LlmStream, Message, MessageRole,
    ProviderConfig, ProviderRegistry, Response, ResponseFormat, StreamChunk, Usage,
};
pub use infrastructure::llm::{ChunkIter, Llm, LlmBuilder, LlmConfig, LlmDefaults};
