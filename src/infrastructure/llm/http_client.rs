use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;

use crate::domain::LlmError;

/// Stream type for HTTP responses
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LlmError>> + Send>>;

/// Default whole-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError>;

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<ByteStream, LlmError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new() -> Result<Self, LlmError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// `timeout` bounds whole non-streamed requests and the connect phase of streamed ones.
    pub fn with_timeout(timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| LlmError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        if stream {
            request = request.header("Accept", "text/event-stream");
        } else {
            request = request.timeout(self.timeout);
        }

        let response = request.json(body).send().await.map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, error_body));
        }

        Ok(response)
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError> {
        let response = self.send(url, headers, body, false).await?;

        let text = response.text().await.map_err(map_send_error)?;
        serde_json::from_str(&text)
            .map_err(|e| LlmError::malformed(format!("Failed to parse response body: {}", e)))
    }

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<ByteStream, LlmError> {
        let response = self.send(url, headers, body, true).await?;

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| LlmError::network(format!("Stream error: {}", e))));

        Ok(Box::pin(stream))
    }
}

fn map_send_error(error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        LlmError::network(format!("Request timed out: {}", error))
    } else {
        LlmError::network(format!("Request failed: {}", error))
    }
}

fn map_status_error(status: StatusCode, body: String) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LlmError::authentication(format!("HTTP {}: {}", status.as_u16(), body))
        }
        _ => LlmError::provider(status.as_u16(), body),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status_error(StatusCode::UNAUTHORIZED, "bad key".to_string()),
            LlmError::Authentication { .. }
        ));

        match map_status_error(StatusCode::TOO_MANY_REQUESTS, "slow down".to_string()) {
            LlmError::Provider { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("expected Provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_client_timeout() {
        let client = HttpClient::with_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(5));
    }
}
