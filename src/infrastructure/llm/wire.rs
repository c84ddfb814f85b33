//! Dialect dispatch: one request builder and response extractor per wire format

use std::fmt::Debug;

use serde_json::{Map, Value};

use super::anthropic::AnthropicWire;
use super::openai::OpenAiWire;
use crate::domain::llm::{
    Dialect, Message, ProviderConfig, Response, ResponseFormat, StreamChunk, Usage,
};
use crate::domain::LlmError;

/// Everything a single call needs, resolved from the client configuration at call start
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub provider: ProviderConfig,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub temperature: f32,
    pub response_format: Option<ResponseFormat>,
    pub max_completion_tokens: Option<u32>,
    pub reasoning_effort: Option<String>,
    pub extra: Map<String, Value>,
    pub messages: Vec<Message>,
}

/// One decoded server-sent event
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Chunk(StreamChunk),
    /// Token counts reported ahead of the final chunk
    Usage(Usage),
    /// Keep-alives, role-only deltas and other events with nothing to report
    Skip,
    /// The provider signalled the end of the reply
    Done,
}

/// Request building and reply normalization for one provider dialect
pub trait WireFormat: Send + Sync + Debug {
    fn endpoint(&self, base_url: &str) -> String;

    fn headers(&self, api_key: &str) -> Vec<(&'static str, String)>;

    fn build_body(&self, call: &ResolvedCall, stream: bool) -> Value;

    fn parse_response(&self, raw: Value) -> Result<Response, LlmError>;

    fn parse_event(&self, data: &str) -> Result<StreamEvent, LlmError>;
}

/// The wire format for a dialect
pub fn wire_format(dialect: Dialect) -> &'static dyn WireFormat {
    match dialect {
        Dialect::OpenAiCompatible => &OpenAiWire,
        Dialect::Anthropic => &AnthropicWire,
    }
}

/// Copy provider-specific fields over the body; they win over fixed fields.
pub(crate) fn merge_extra(body: &mut Value, extra: &Map<String, Value>) {
    if let Value::Object(map) = body {
        for (key, value) in extra {
            map.insert(key.clone(), value.clone());
        }
    }
}

/// Fold a partial usage report into what the stream reported so far.
///
/// Some providers send prompt and completion counts in separate events.
pub(crate) fn combine_usage(reported: Option<&Usage>, usage: Usage) -> Usage {
    match reported {
        Some(reported) => Usage::new(
            reported.prompt_tokens.max(usage.prompt_tokens),
            reported.completion_tokens.max(usage.completion_tokens),
        ),
        None => usage,
    }
}
