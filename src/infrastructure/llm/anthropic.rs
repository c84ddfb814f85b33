use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::wire::{merge_extra, ResolvedCall, StreamEvent, WireFormat};
use crate::domain::llm::{
    parse_data_url, ContentPart, Message, MessageRole, Response, ResponseFormat, StreamChunk,
    Usage,
};
use crate::domain::{FinishReason, LlmError};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic messages dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicWire;

impl WireFormat for AnthropicWire {
    fn endpoint(&self, base_url: &str) -> String {
        format!("{}/v1/messages", base_url.trim_end_matches('/'))
    }

    fn headers(&self, api_key: &str) -> Vec<(&'static str, String)> {
        vec![
            ("x-api-key", api_key.to_string()),
            ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ("Content-Type", "application/json".to_string()),
        ]
    }

    fn build_body(&self, call: &ResolvedCall, stream: bool) -> Value {
        let (system, messages) = split_system_messages(&call.messages);

        let anthropic_messages: Vec<Value> = messages.into_iter().map(message_to_wire).collect();

        let mut body = json!({
            "model": call.model,
            "messages": anthropic_messages,
            "max_tokens": call.max_completion_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": call.temperature,
        });

        if let Some(system_content) = system {
            body["system"] = json!(system_content);
        }

        if stream {
            body["stream"] = json!(true);
        }

        if call.response_format == Some(ResponseFormat::JsonObject) {
            debug!(provider = %call.provider.name, "JSON mode is not supported, sending as text");
        }

        merge_extra(&mut body, &call.extra);
        body
    }

    fn parse_response(&self, raw: Value) -> Result<Response, LlmError> {
        let response: AnthropicResponse = serde_json::from_value(raw.clone())
            .map_err(|e| LlmError::malformed(format!("Unexpected message shape: {}", e)))?;

        let content = response
            .content
            .into_iter()
            .filter_map(|block| {
                if block.content_type == "text" {
                    block.text
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        let mut llm_response = Response::new(content, raw)
            .with_id(response.id)
            .with_model(response.model)
            .with_finish_reason(parse_stop_reason(response.stop_reason.as_deref()));

        if let Some(usage) = response.usage {
            llm_response =
                llm_response.with_usage(Usage::new(usage.input_tokens, usage.output_tokens));
        }

        Ok(llm_response)
    }

    fn parse_event(&self, data: &str) -> Result<StreamEvent, LlmError> {
        let event: AnthropicStreamEvent = serde_json::from_str(data)
            .map_err(|e| LlmError::malformed(format!("Unexpected stream event: {}", e)))?;

        match event.event_type.as_str() {
            "content_block_delta" => {
                let text = event
                    .delta
                    .filter(|delta| delta.delta_type == "text_delta")
                    .and_then(|delta| delta.text);

                match text {
                    Some(text) if !text.is_empty() => Ok(StreamEvent::Chunk(StreamChunk::new(text))),
                    _ => Ok(StreamEvent::Skip),
                }
            }
            "message_delta" => {
                let mut chunk = StreamChunk::default();

                if let Some(reason) = event.delta.and_then(|delta| delta.stop_reason) {
                    chunk = chunk.with_finish_reason(parse_stop_reason(Some(&reason)));
                }

                if let Some(usage) = event.usage {
                    chunk = chunk.with_usage(Usage::new(usage.input_tokens, usage.output_tokens));
                }

                if chunk.is_empty() {
                    Ok(StreamEvent::Skip)
                } else {
                    Ok(StreamEvent::Chunk(chunk))
                }
            }
            "message_start" => match event.message.and_then(|message| message.usage) {
                Some(usage) => Ok(StreamEvent::Usage(Usage::new(
                    usage.input_tokens,
                    usage.output_tokens,
                ))),
                None => Ok(StreamEvent::Skip),
            },
            "message_stop" => Ok(StreamEvent::Done),
            // in-band failure after a 200 response
            "error" => Err(LlmError::provider(200, data.to_string())),
            _ => Ok(StreamEvent::Skip),
        }
    }
}

fn split_system_messages(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
    let mut system_content = String::new();
    let mut other_messages = Vec::new();

    for msg in messages {
        if msg.role == MessageRole::System {
            if !system_content.is_empty() {
                system_content.push('\n');
            }

            if let Some(text) = msg.content_text() {
                system_content.push_str(text);
            }
        } else {
            other_messages.push(msg);
        }
    }

    let system = if system_content.is_empty() {
        None
    } else {
        Some(system_content)
    };

    (system, other_messages)
}

fn message_to_wire(message: &Message) -> Value {
    if !message.is_multipart() {
        return json!({
            "role": message.role.as_str(),
            "content": message.content_text().unwrap_or(""),
        });
    }

    let blocks: Vec<Value> = message
        .content_parts()
        .into_iter()
        .map(|part| match part {
            ContentPart::Text { text } => json!({"type": "text", "text": text}),
            ContentPart::ImageUrl { url } => match parse_data_url(url) {
                Some((media_type, data)) => json!({
                    "type": "image",
                    "source": {"type": "base64", "media_type": media_type, "data": data},
                }),
                None => json!({"type": "image", "source": {"type": "url", "url": url}}),
            },
            ContentPart::File { file_data, .. } => match parse_data_url(file_data) {
                Some((media_type, data)) => json!({
                    "type": "document",
                    "source": {"type": "base64", "media_type": media_type, "data": data},
                }),
                None => json!({"type": "document", "source": {"type": "url", "url": file_data}}),
            },
        })
        .collect();

    json!({"role": message.role.as_str(), "content": blocks})
}

fn parse_stop_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        Some("tool_use") => FinishReason::ToolCalls,
        _ => FinishReason::Stop,
    }
}

// Anthropic API types

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicStreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    delta: Option<StreamDelta>,
    usage: Option<AnthropicUsage>,
    message: Option<StreamMessage>,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(rename = "type", default)]
    delta_type: String,
    text: Option<String>,
    stop_reason: Option<String>,
}
