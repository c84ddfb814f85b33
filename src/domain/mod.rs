//! Domain layer - Messages, requests, replies, providers and errors

pub mod error;
pub mod llm;

pub use error::LlmError;
pub use llm::{
    ContentPart, Dialect, FinishReason, LlmRequest, LlmRequestBuilder, LlmStream, Message,
    MessageRole, ProviderConfig, ProviderRegistry, Response, ResponseFormat, StreamChunk, Usage,
};
