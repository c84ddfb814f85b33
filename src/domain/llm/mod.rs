//! Provider-agnostic chat model: messages, requests, replies and the provider table

mod message;
mod provider;
mod request;
mod response;

pub use message::{parse_data_url, ContentPart, Message, MessageRole};
pub use provider::{Dialect, ProviderConfig, ProviderRegistry};
pub use request::{LlmRequest, LlmRequestBuilder, ResponseFormat};
pub use response::{FinishReason, LlmStream, Response, StreamChunk, Usage};
