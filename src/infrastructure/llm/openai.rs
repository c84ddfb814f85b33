use serde::Deserialize;
use serde_json::{json, Value};

use super::wire::{merge_extra, ResolvedCall, StreamEvent, WireFormat};
use crate::domain::llm::{ContentPart, Message, Response, ResponseFormat, StreamChunk, Usage};
use crate::domain::{FinishReason, LlmError};

/// OpenAI chat-completions dialect, also spoken by Groq, Gemini, Perplexity and others
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiWire;

impl WireFormat for OpenAiWire {
    fn endpoint(&self, base_url: &str) -> String {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }

    fn headers(&self, api_key: &str) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", format!("Bearer {}", api_key)),
            ("Content-Type", "application/json".to_string()),
        ]
    }

    fn build_body(&self, call: &ResolvedCall, stream: bool) -> Value {
        let messages: Vec<Value> = call.messages.iter().map(message_to_wire).collect();

        let mut body = json!({
            "model": call.model,
            "messages": messages,
            "temperature": call.temperature,
        });

        // text is every provider's default; some reject it spelled out
        if call.response_format == Some(ResponseFormat::JsonObject) {
            body["response_format"] = json!({"type": "json_object"});
        }

        if let Some(max_tokens) = call.max_completion_tokens {
            body["max_completion_tokens"] = json!(max_tokens);
        }

        if let Some(ref effort) = call.reasoning_effort {
            body["reasoning_effort"] = json!(effort);
        }

        if stream {
            body["stream"] = json!(true);
            body["stream_options"] = json!({"include_usage": true});
        }

        merge_extra(&mut body, &call.extra);
        body
    }

    fn parse_response(&self, raw: Value) -> Result<Response, LlmError> {
        let response: OpenAiResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            LlmError::malformed(format!("Unexpected chat completion shape: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::malformed("No choices in response"))?;

        let mut llm_response = Response::new(choice.message.content.unwrap_or_default(), raw);

        if let Some(id) = response.id {
            llm_response = llm_response.with_id(id);
        }

        if let Some(model) = response.model {
            llm_response = llm_response.with_model(model);
        }

        if let Some(reason) = choice.finish_reason {
            llm_response = llm_response.with_finish_reason(parse_finish_reason(&reason));
        }

        if let Some(usage) = response.usage {
            llm_response =
                llm_response.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
        }

        Ok(llm_response)
    }

    fn parse_event(&self, data: &str) -> Result<StreamEvent, LlmError> {
        if data.trim() == "[DONE]" {
            return Ok(StreamEvent::Done);
        }

        let chunk: OpenAiStreamChunk = serde_json::from_str(data)
            .map_err(|e| LlmError::malformed(format!("Unexpected stream chunk: {}", e)))?;

        // errors after the 200 status arrive in-band
        if chunk.error.is_some() {
            return Err(LlmError::provider(200, data.to_string()));
        }

        let mut stream_chunk = StreamChunk::default();

        if let Some(choice) = chunk.choices.into_iter().next() {
            if let Some(delta) = choice.delta.and_then(|d| d.content) {
                stream_chunk.content = delta;
            }

            if let Some(reason) = choice.finish_reason {
                stream_chunk = stream_chunk.with_finish_reason(parse_finish_reason(&reason));
            }
        }

        if let Some(usage) = chunk.usage {
            stream_chunk =
                stream_chunk.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
        }

        if stream_chunk.is_empty() {
            Ok(StreamEvent::Skip)
        } else {
            Ok(StreamEvent::Chunk(stream_chunk))
        }
    }
}

fn message_to_wire(message: &Message) -> Value {
    if !message.is_multipart() {
        return json!({
            "role": message.role.as_str(),
            "content": message.content_text().unwrap_or(""),
        });
    }

    let parts: Vec<Value> = message
        .content_parts()
        .into_iter()
        .map(|part| match part {
            ContentPart::Text { text } => json!({"type": "text", "text": text}),
            ContentPart::ImageUrl { url } => json!({"type": "image_url", "image_url": {"url": url}}),
            ContentPart::File {
                filename,
                file_data,
            } => json!({
                "type": "file",
                "file": {"filename": filename, "file_data": file_data},
            }),
        })
        .collect();

    json!({"role": message.role.as_str(), "content": parts})
}

fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        _ => FinishReason::Stop,
    }
}

// OpenAI API types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    id: Option<String>,
    model: Option<String>,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    usage: Option<OpenAiUsage>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: Option<OpenAiDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}
