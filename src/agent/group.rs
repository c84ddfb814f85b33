use futures::future::join_all;
use tracing::debug;

use super::{Agent, AgentInput};
use crate::domain::llm::Response;
use crate::domain::LlmError;

/// Agents that all answer the same input
#[derive(Debug, Clone, Default)]
pub struct AgentGroup {
    agents: Vec<Agent>,
}

impl AgentGroup {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    pub fn push(&mut self, agent: Agent) {
        self.agents.push(agent);
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Run every agent concurrently; results follow agent order
    pub async fn work_async(&self, input: impl Into<AgentInput>) -> Vec<Result<Response, LlmError>> {
        let input = input.into();
        debug!(agents = self.agents.len(), "Agent group working");

        join_all(
            self.agents
                .iter()
                .map(|agent| agent.work_async(input.clone())),
        )
        .await
    }

    /// Run every agent in turn, blocking
    pub fn work(&self, input: impl Into<AgentInput>) -> Vec<Result<Response, LlmError>> {
        let input = input.into();

        self.agents
            .iter()
            .map(|agent| agent.work(input.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::mock::MockHttpClient;
    use crate::infrastructure::llm::Llm;
    use serde_json::json;
    use std::sync::Arc;

    fn agent(mock: &Arc<MockHttpClient>, base_url: &str) -> Agent {
        let llm = Llm::builder()
            .provider("openai")
            .api_key("sk-test")
            .base_url(base_url)
            .http_client(mock.clone())
            .build()
            .unwrap();
        Agent::new("Answer", llm)
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({"choices": [{"message": {"content": content}, "finish_reason": "stop"}]})
    }

    #[tokio::test]
    async fn test_group_results_follow_agent_order() {
        let mock = Arc::new(
            MockHttpClient::new()
                .with_response("http://first/chat/completions", completion("one"))
                .with_status_error("http://second/chat/completions", 503, "busy")
                .with_response("http://third/chat/completions", completion("three")),
        );

        let group = AgentGroup::new(vec![
            agent(&mock, "http://first"),
            agent(&mock, "http://second"),
            agent(&mock, "http://third"),
        ]);

        let results = group.work_async("question").await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().content, "one");
        assert!(matches!(results[1], Err(LlmError::Provider { status: 503, .. })));
        assert_eq!(results[2].as_ref().unwrap().content, "three");
        assert_eq!(mock.call_count(), 3);
    }

    #[test]
    fn test_group_blocking_work() {
        let mock = Arc::new(
            MockHttpClient::new().with_response("http://only/chat/completions", completion("ok")),
        );
        let group = AgentGroup::new(vec![agent(&mock, "http://only")]);

        let results = group.work("question");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap().content, "ok");
    }
}
