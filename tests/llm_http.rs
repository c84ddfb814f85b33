//! End-to-end client tests against a local HTTP server

use std::time::Duration;

use agentine::{Agent, Llm, LlmDefaults, LlmError, Message, ResponseFormat};
use futures::{StreamExt, TryStreamExt};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai_llm(server: &MockServer) -> Llm {
    Llm::builder()
        .provider("openai")
        .api_key("sk-test")
        .base_url(server.uri())
        .build()
        .unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-42",
        "object": "chat.completion",
        "model": "gpt-5-chat-latest",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 9, "completion_tokens": 4, "total_tokens": 13}
    })
}

#[tokio::test]
async fn chat_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-5-chat-latest",
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hi!")))
        .expect(1)
        .mount(&server)
        .await;

    let response = openai_llm(&server)
        .chat_async(Message::user("Hello"))
        .await
        .unwrap();

    assert_eq!(response.content, "Hi!");
    assert_eq!(response.id.as_deref(), Some("chatcmpl-42"));
    assert_eq!(response.usage.unwrap().total_tokens, 13);
}

#[tokio::test]
async fn json_agent_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "response_format": {"type": "json_object"},
            "messages": [{"role": "system", "content": "Reply in JSON"}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(r#"{"first_name":"Neil","last_name":"Armstrong"}"#)),
        )
        .mount(&server)
        .await;

    let agent = Agent::new("Reply in JSON", openai_llm(&server))
        .with_response_format(ResponseFormat::JsonObject);

    let response = agent.work_async("Who walked on the moon first?").await.unwrap();

    assert_eq!(response.data.unwrap()["last_name"], "Armstrong");
}

#[tokio::test]
async fn server_error_is_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;

    match openai_llm(&server).chat_async(Message::user("Hello")).await {
        Err(LlmError::Provider { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected Provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn unauthorized_is_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let result = openai_llm(&server).chat_async(Message::user("Hello")).await;

    assert!(matches!(result, Err(LlmError::Authentication { .. })));
}

#[tokio::test]
async fn invalid_body_is_malformed_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = openai_llm(&server).chat_async(Message::user("Hello")).await;

    assert!(matches!(result, Err(LlmError::MalformedResponse { .. })));
}

#[tokio::test]
async fn streamed_deltas_match_chat_content() {
    let server = MockServer::start().await;

    let sse = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"The Eagle \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"has landed.\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":5,\"completion_tokens\":4}}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("The Eagle has landed.")))
        .mount(&server)
        .await;

    let llm = openai_llm(&server);

    let response = llm.chat_async(Message::user("Status?")).await.unwrap();
    let chunks: Vec<_> = llm
        .stream_async(Message::user("Status?"))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    let streamed: String = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(streamed, response.content);
    assert_eq!(chunks.last().unwrap().usage.as_ref().unwrap().total_tokens, 9);
}

#[tokio::test]
async fn dropped_stream_leaves_client_usable() {
    let server = MockServer::start().await;

    let sse = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"one \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"two \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"three\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("still here")))
        .mount(&server)
        .await;

    let llm = openai_llm(&server);

    let mut stream = llm.stream_async(Message::user("Count")).await.unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.content, "one ");
    drop(stream);

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        llm.chat_async(Message::user("Still there?")),
    )
    .await
    .expect("chat after dropped stream hung")
    .unwrap();

    assert_eq!(response.content, "still here");
}

#[tokio::test]
async fn anthropic_dialect_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "system": "Be brief",
            "max_tokens": 4096,
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": "Hi."}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 6, "output_tokens": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let llm = Llm::builder()
        .provider("anthropic")
        .api_key("ant-test")
        .base_url(server.uri())
        .build()
        .unwrap();

    let response = llm
        .chat_async(vec![Message::system("Be brief"), Message::user("Hello")])
        .await
        .unwrap();

    assert_eq!(response.content, "Hi.");
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let llm = Llm::builder()
        .provider("openai")
        .api_key("sk-test")
        .base_url("http://127.0.0.1:1")
        .build()
        .unwrap();

    let result = llm.chat_async(Message::user("Hello")).await;

    assert!(matches!(result, Err(LlmError::Network { .. })));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("late"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let llm = Llm::builder()
        .defaults(LlmDefaults {
            timeout: Duration::from_millis(200),
            ..Default::default()
        })
        .api_key("sk-test")
        .base_url(server.uri())
        .build()
        .unwrap();

    let result = llm.chat_async(Message::user("Hello")).await;

    assert!(matches!(result, Err(LlmError::Network { .. })));
}
