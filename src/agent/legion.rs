//! Routing between specialist agents
//!
//! A selector agent picks which specialists should answer. A single pick answers the user
//! directly; otherwise every pick answers, the answers are added to the history as hidden
//! assistant turns, and the speaker writes the final reply.

use futures::future::join_all;
use serde_json::Value;
use tracing::debug;

use super::{Agent, AgentIndex, AgentInput};
use crate::domain::llm::{LlmStream, Message, Response, ResponseFormat};
use crate::domain::LlmError;
use crate::infrastructure::llm::{block_on, ChunkIter};

enum Plan<'a> {
    /// Exactly one specialist was picked; it gets the original input
    Single(&'a Agent),
    /// The speaker answers from this history
    Speaker(Vec<Message>),
}

#[derive(Debug, Clone)]
pub struct AgentLegion {
    speaker: Agent,
    selector: Agent,
    index: AgentIndex,
}

impl AgentLegion {
    /// The selector is switched to JSON output; it must reply `{"selections": [names...]}`.
    pub fn new(speaker: Agent, selector: Agent, index: AgentIndex) -> Self {
        Self {
            speaker,
            selector: selector.with_response_format(ResponseFormat::JsonObject),
            index,
        }
    }

    pub fn speaker(&self) -> &Agent {
        &self.speaker
    }

    pub fn selector(&self) -> &Agent {
        &self.selector
    }

    pub fn index(&self) -> &AgentIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut AgentIndex {
        &mut self.index
    }

    async fn select(&self, input: &AgentInput) -> Result<Vec<String>, LlmError> {
        let response = self.selector.work_async(input.clone()).await?;
        selections(response)
    }

    async fn plan(&self, input: &AgentInput) -> Result<Plan<'_>, LlmError> {
        let selections = self.select(input).await?;

        let selected: Vec<(&str, &Agent)> = selections
            .iter()
            .filter_map(|name| self.index.get(name).map(|agent| (name.as_str(), agent)))
            .collect();

        debug!(selections = ?selections, matched = selected.len(), "Legion selection");

        if let [(_, agent)] = selected.as_slice() {
            return Ok(Plan::Single(*agent));
        }

        let results = join_all(
            selected
                .iter()
                .map(|(_, agent)| agent.work_async(input.clone())),
        )
        .await;

        let mut history = input.messages.clone();
        if let Some(query) = input.query.as_ref().filter(|q| !q.is_empty()) {
            history.push(Message::user(query.clone()));
        }

        for ((name, _), result) in selected.iter().zip(results) {
            let response = result?;
            history.push(Message::assistant(format!(
                "**{} agent** response (NOT VISIBLE TO USER):\n\n{}",
                name, response.content
            )));
        }

        Ok(Plan::Speaker(history))
    }

    pub async fn work_async(&self, input: impl Into<AgentInput>) -> Result<Response, LlmError> {
        let input = input.into();

        match self.plan(&input).await? {
            Plan::Single(agent) => agent.work_async(input).await,
            Plan::Speaker(history) => self.speaker.work_async(history).await,
        }
    }

    /// Blocking [`AgentLegion::work_async`]
    pub fn work(&self, input: impl Into<AgentInput>) -> Result<Response, LlmError> {
        block_on(self.work_async(input))?
    }

    pub async fn stream_async(&self, input: impl Into<AgentInput>) -> Result<LlmStream, LlmError> {
        let input = input.into();

        match self.plan(&input).await? {
            Plan::Single(agent) => agent.stream_async(input).await,
            Plan::Speaker(history) => self.speaker.stream_async(history).await,
        }
    }

    pub fn stream(&self, input: impl Into<AgentInput>) -> Result<ChunkIter, LlmError> {
        let stream = block_on(self.stream_async(input))??;
        Ok(ChunkIter::new(stream))
    }
}

/// Agent names from a selector reply
fn selections(response: Response) -> Result<Vec<String>, LlmError> {
    let names = response
        .data
        .as_ref()
        .and_then(|data| data.get("selections"))
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<String>>>()
        });

    match names {
        Some(names) => Ok(names),
        None => Err(LlmError::response_format(
            "Selector reply has no 'selections' list of agent names",
            response,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::mock::MockHttpClient;
    use crate::infrastructure::llm::Llm;
    use serde_json::json;
    use std::sync::Arc;

    fn completion(content: &str) -> Value {
        json!({"choices": [{"message": {"content": content}, "finish_reason": "stop"}]})
    }

    fn agent(mock: &Arc<MockHttpClient>, base_url: &str, instruction: &str) -> Agent {
        let llm = Llm::builder()
            .provider("openai")
            .api_key("sk-test")
            .base_url(base_url)
            .http_client(mock.clone())
            .build()
            .unwrap();
        Agent::new(instruction, llm)
    }

    fn legion(mock: &Arc<MockHttpClient>) -> AgentLegion {
        let mut index = AgentIndex::new();
        index.add("math", agent(mock, "http://math", "Do math"), false);
        index.add("poetry", agent(mock, "http://poetry", "Write poems"), false);

        AgentLegion::new(
            agent(mock, "http://speaker", "Summarize for the user"),
            agent(mock, "http://selector", "Pick agents"),
            index,
        )
    }

    fn urls(mock: &MockHttpClient) -> Vec<String> {
        mock.requests().into_iter().map(|r| r.url).collect()
    }

    #[tokio::test]
    async fn test_single_selection_answers_directly() {
        let mock = Arc::new(
            MockHttpClient::new()
                .with_response(
                    "http://selector/chat/completions",
                    completion(r#"{"selections": ["math"]}"#),
                )
                .with_response("http://math/chat/completions", completion("42")),
        );

        let response = legion(&mock).work_async("6 * 7?").await.unwrap();

        assert_eq!(response.content, "42");
        assert_eq!(
            urls(&mock),
            vec!["http://selector/chat/completions", "http://math/chat/completions"]
        );

        let requests = mock.requests();
        assert_eq!(requests[0].body["response_format"], json!({"type": "json_object"}));
    }

    #[tokio::test]
    async fn test_multiple_selections_go_through_speaker() {
        let mock = Arc::new(
            MockHttpClient::new()
                .with_response(
                    "http://selector/chat/completions",
                    completion(r#"{"selections": ["math", "ghost", "poetry"]}"#),
                )
                .with_response("http://math/chat/completions", completion("42"))
                .with_response("http://poetry/chat/completions", completion("Roses"))
                .with_response("http://speaker/chat/completions", completion("Final")),
        );

        let response = legion(&mock).work_async("Numbers and verse").await.unwrap();

        assert_eq!(response.content, "Final");

        let speaker = mock.last_request().unwrap();
        assert_eq!(speaker.url, "http://speaker/chat/completions");

        let messages = speaker.body["messages"].as_array().unwrap().clone();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["content"], "Summarize for the user");
        assert_eq!(messages[1], json!({"role": "user", "content": "Numbers and verse"}));
        assert_eq!(
            messages[2]["content"],
            "**math agent** response (NOT VISIBLE TO USER):\n\n42"
        );
        assert_eq!(
            messages[3]["content"],
            "**poetry agent** response (NOT VISIBLE TO USER):\n\nRoses"
        );
    }

    #[tokio::test]
    async fn test_selector_without_selections_is_format_error() {
        let mock = Arc::new(MockHttpClient::new().with_response(
            "http://selector/chat/completions",
            completion(r#"{"agents": "math"}"#),
        ));

        let error = legion(&mock).work_async("?").await.unwrap_err();

        assert!(matches!(error, LlmError::ResponseFormat { .. }));
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_selections_parsing() {
        let response = Response::new("", json!({})).with_data(json!({"selections": ["a", "b"]}));
        assert_eq!(selections(response).unwrap(), vec!["a", "b"]);

        let response = Response::new("", json!({})).with_data(json!({"selections": ["a", 1]}));
        assert!(selections(response).is_err());
    }
}
