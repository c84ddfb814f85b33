use thiserror::Error;

use super::llm::Response;

/// Errors surfaced by the client, agents and transport.
///
/// Nothing is retried internally: every failure reaches the caller as soon as it happens.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Unknown provider '{name}'. Valid providers are: {known}")]
    UnknownProvider { name: String, known: String },

    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Provider error (HTTP {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Response format error: {message}")]
    ResponseFormat {
        message: String,
        response: Box<Response>,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl LlmError {
    pub fn unknown_provider(name: impl Into<String>, known: &[String]) -> Self {
        Self::UnknownProvider {
            name: name.into(),
            known: known.join(", "),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn provider(status: u16, body: impl Into<String>) -> Self {
        Self::Provider {
            status,
            body: body.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn response_format(message: impl Into<String>, response: Response) -> Self {
        Self::ResponseFormat {
            message: message.into(),
            response: Box::new(response),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Provider { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The response carried by a [`LlmError::ResponseFormat`] error.
    ///
    /// JSON-mode agent calls that return unparseable content still hand back the
    /// reply; `data` is left empty.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::ResponseFormat { response, .. } => Some(*response),
            _ => None,
        }
    }
}
