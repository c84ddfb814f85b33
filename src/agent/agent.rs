use serde_json::{Map, Value};
use tracing::debug;

use super::template::{self, DEFAULT_FALLBACK};
use crate::domain::llm::{LlmRequest, LlmStream, Message, Response, ResponseFormat};
use crate::domain::LlmError;
use crate::infrastructure::llm::{ChunkIter, Llm};

/// What an agent is asked to work on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentInput {
    /// Appended as the final user turn when present
    pub query: Option<String>,
    /// Prior conversation, sent between the instruction and the query
    pub messages: Vec<Message>,
    /// Values for `<<key>>` placeholders in the instruction and query
    pub data: Option<Map<String, Value>>,
}

impl AgentInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<&str> for AgentInput {
    fn from(query: &str) -> Self {
        Self::query(query)
    }
}

impl From<String> for AgentInput {
    fn from(query: String) -> Self {
        Self::query(query)
    }
}

impl From<Vec<Message>> for AgentInput {
    fn from(messages: Vec<Message>) -> Self {
        Self::new().with_messages(messages)
    }
}

impl From<&[Message]> for AgentInput {
    fn from(messages: &[Message]) -> Self {
        Self::new().with_messages(messages.to_vec())
    }
}

/// An LLM client bound to a fixed instruction and output format.
///
/// Agents keep no conversation state; every call carries its own history.
#[derive(Debug, Clone)]
pub struct Agent {
    name: Option<String>,
    instruction: String,
    llm: Llm,
    response_format: ResponseFormat,
}

impl Agent {
    pub fn new(instruction: impl Into<String>, llm: Llm) -> Self {
        Self {
            name: None,
            instruction: instruction.into(),
            llm,
            response_format: ResponseFormat::Text,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn set_instruction(&mut self, instruction: impl Into<String>) {
        self.instruction = instruction.into();
    }

    pub fn response_format(&self) -> ResponseFormat {
        self.response_format
    }

    pub fn set_response_format(&mut self, format: ResponseFormat) {
        self.response_format = format;
    }

    pub fn llm(&self) -> &Llm {
        &self.llm
    }

    pub fn llm_mut(&mut self) -> &mut Llm {
        &mut self.llm
    }

    /// `[system(instruction), ...history, user(query)]`, with placeholders filled in
    pub fn prepare_messages(&self, input: AgentInput) -> Vec<Message> {
        let AgentInput {
            query,
            messages,
            data,
        } = input;

        let fill = |text: &str| match &data {
            Some(data) => template::render(text, data, DEFAULT_FALLBACK),
            None => text.to_string(),
        };

        let instruction = fill(&self.instruction);
        let query = query.map(|q| fill(&q));

        let mut chat_messages = Vec::with_capacity(messages.len() + 2);

        if !instruction.is_empty() {
            chat_messages.push(Message::system(instruction));
        }

        chat_messages.extend(messages);

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            chat_messages.push(Message::user(query));
        }

        chat_messages
    }

    fn request(&self, input: AgentInput) -> LlmRequest {
        let mut request = LlmRequest::new(self.prepare_messages(input));
        request.response_format = Some(self.response_format);
        request
    }

    /// Fill `data` from the content for JSON-format agents
    fn parse_output(&self, response: Response) -> Result<Response, LlmError> {
        if self.response_format != ResponseFormat::JsonObject {
            return Ok(response);
        }

        match serde_json::from_str::<Value>(&response.content) {
            Ok(data) => Ok(response.with_data(data)),
            Err(e) => {
                debug!(agent = ?self.name, error = %e, "Agent reply is not valid JSON");
                Err(LlmError::response_format(
                    format!("Reply is not valid JSON: {}", e),
                    response,
                ))
            }
        }
    }

    pub async fn work_async(&self, input: impl Into<AgentInput>) -> Result<Response, LlmError> {
        let request = self.request(input.into());
        debug!(agent = ?self.name, messages = request.messages.len(), "Agent working");

        let response = self.llm.chat_async(request).await?;
        self.parse_output(response)
    }

    /// Blocking [`Agent::work_async`]; must not be called from inside an async runtime.
    pub fn work(&self, input: impl Into<AgentInput>) -> Result<Response, LlmError> {
        let request = self.request(input.into());
        debug!(agent = ?self.name, messages = request.messages.len(), "Agent working");

        let response = self.llm.chat(request)?;
        self.parse_output(response)
    }

    /// Stream the reply; JSON output is not parsed
    pub async fn stream_async(&self, input: impl Into<AgentInput>) -> Result<LlmStream, LlmError> {
        self.llm.stream_async(self.request(input.into())).await
    }

    pub fn stream(&self, input: impl Into<AgentInput>) -> Result<ChunkIter, LlmError> {
        self.llm.stream(self.request(input.into()))
    }
}
