//! LLM client and provider dialects

mod anthropic;
mod blocking;
mod client;
mod http_client;
mod openai;
mod sse;
mod wire;

pub use anthropic::AnthropicWire;
pub use blocking::ChunkIter;
pub use client::{Llm, LlmBuilder, LlmConfig, LlmDefaults};
pub use http_client::{ByteStream, HttpClient, HttpClientTrait, DEFAULT_TIMEOUT};
pub use openai::OpenAiWire;
pub use wire::{wire_format, ResolvedCall, StreamEvent, WireFormat};

pub(crate) use blocking::block_on;

#[cfg(test)]
pub(crate) use http_client::mock;
