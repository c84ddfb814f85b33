use std::sync::Arc;
use std::time::Duration;

use futures::future::ready;
use futures::{stream, StreamExt, TryStreamExt};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::blocking::{block_on, ChunkIter};
use super::http_client::{HttpClient, HttpClientTrait, DEFAULT_TIMEOUT};
use super::sse::sse_events;
use super::wire::{combine_usage, wire_format, ResolvedCall, StreamEvent};
use crate::domain::llm::{
    LlmRequest, LlmStream, ProviderConfig, ProviderRegistry, Response, ResponseFormat, Usage,
};
use crate::domain::LlmError;

/// Process-level settings read once when an [`Llm`] is built
#[derive(Debug, Clone, PartialEq)]
pub struct LlmDefaults {
    pub provider: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_concurrency: usize,
}

impl Default for LlmDefaults {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            temperature: 1.0,
            timeout: DEFAULT_TIMEOUT,
            max_concurrency: 100,
        }
    }
}

/// Mutable configuration owned by one client
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    /// Explicit key; `None` falls back to the provider's environment variable
    pub api_key: Option<String>,
    /// Explicit endpoint root; `None` uses the provider default
    pub base_url: Option<String>,
    pub temperature: f32,
    pub response_format: Option<ResponseFormat>,
    pub max_completion_tokens: Option<u32>,
    pub reasoning_effort: Option<String>,
    pub extra_params: Map<String, Value>,
}

/// Provider-agnostic chat client
#[derive(Debug, Clone)]
pub struct Llm {
    config: LlmConfig,
    provider: ProviderConfig,
    registry: Arc<ProviderRegistry>,
    http: Arc<dyn HttpClientTrait>,
    max_concurrency: usize,
}

impl Llm {
    /// A client for the default provider, keyed from the environment
    pub fn new() -> Result<Self, LlmError> {
        Self::builder().build()
    }

    pub fn from_defaults(defaults: &LlmDefaults) -> Result<Self, LlmError> {
        Self::builder().defaults(defaults.clone()).build()
    }

    pub fn builder() -> LlmBuilder {
        LlmBuilder::default()
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn provider(&self) -> &str {
        &self.config.provider
    }

    pub fn provider_config(&self) -> &ProviderConfig {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// The endpoint root calls go to
    pub fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(&self.provider.base_url)
    }

    /// The key calls would use right now: the explicit one, else the environment's
    pub fn api_key(&self) -> Option<String> {
        self.config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.provider.api_key_from_env())
    }

    pub fn temperature(&self) -> f32 {
        self.config.temperature
    }

    pub fn response_format(&self) -> Option<ResponseFormat> {
        self.config.response_format
    }

    pub fn extra_params(&self) -> &Map<String, Value> {
        &self.config.extra_params
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Switch provider.
    ///
    /// The model resets to the new provider's default and the key and base URL overrides are
    /// cleared. Sampling settings and extra params carry over. On error nothing changes.
    pub fn set_provider(&mut self, name: &str) -> Result<(), LlmError> {
        let provider = self.registry.lookup(name)?;

        debug!(from = %self.config.provider, to = %provider.name, "Switching provider");

        self.config.provider = provider.name.clone();
        self.config.model = provider.default_model.clone();
        self.config.api_key = None;
        self.config.base_url = None;
        self.provider = provider;
        Ok(())
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = model.into();
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.config.api_key = Some(api_key.into());
    }

    pub fn clear_api_key(&mut self) {
        self.config.api_key = None;
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.config.base_url = Some(base_url.into().trim_end_matches('/').to_string());
    }

    pub fn clear_base_url(&mut self) {
        self.config.base_url = None;
    }

    pub fn set_temperature(&mut self, temperature: f32) {
        self.config.temperature = temperature;
    }

    pub fn set_response_format(&mut self, format: Option<ResponseFormat>) {
        self.config.response_format = format;
    }

    pub fn set_max_completion_tokens(&mut self, tokens: Option<u32>) {
        self.config.max_completion_tokens = tokens;
    }

    pub fn set_reasoning_effort(&mut self, effort: Option<String>) {
        self.config.reasoning_effort = effort;
    }

    pub fn set_extra_param(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.config.extra_params.insert(key.into(), value.into());
    }

    pub fn remove_extra_param(&mut self, key: &str) -> Option<Value> {
        self.config.extra_params.remove(key)
    }

    /// Snapshot the configuration and merge per-call overrides
    fn resolve(&self, request: LlmRequest) -> Result<ResolvedCall, LlmError> {
        let api_key = self.api_key().ok_or_else(|| {
            LlmError::authentication(format!(
                "No API key for provider '{}': set {} or configure one explicitly",
                self.provider.name, self.provider.api_key_env_var
            ))
        })?;

        let mut extra = self.config.extra_params.clone();
        extra.extend(request.extra);

        Ok(ResolvedCall {
            provider: self.provider.clone(),
            model: request.model.unwrap_or_else(|| self.config.model.clone()),
            api_key,
            base_url: self.base_url().to_string(),
            temperature: request.temperature.unwrap_or(self.config.temperature),
            response_format: request.response_format.or(self.config.response_format),
            max_completion_tokens: request
                .max_completion_tokens
                .or(self.config.max_completion_tokens),
            reasoning_effort: self.config.reasoning_effort.clone(),
            extra,
            messages: request.messages,
        })
    }

    pub async fn chat_async(&self, request: impl Into<LlmRequest>) -> Result<Response, LlmError> {
        let call = self.resolve(request.into())?;
        let wire = wire_format(call.provider.dialect);

        let url = wire.endpoint(&call.base_url);
        let headers = wire.headers(&call.api_key);
        let body = wire.build_body(&call, false);

        debug!(
            provider = %call.provider.name,
            model = %call.model,
            messages = call.messages.len(),
            "Sending chat request"
        );

        let header_refs: Vec<(&str, &str)> =
            headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let raw = self
            .http
            .post_json(&url, header_refs, &body)
            .await
            .map_err(|e| {
                warn!(provider = %call.provider.name, error = %e, "Chat request failed");
                e
            })?;

        let response = wire.parse_response(raw)?;

        debug!(
            provider = %call.provider.name,
            content_length = response.content.len(),
            "Chat response received"
        );

        Ok(response)
    }

    /// Stream the reply.
    ///
    /// The returned stream owns its snapshot of the configuration and does not borrow the
    /// client. Dropping it cancels the request.
    pub async fn stream_async(&self, request: impl Into<LlmRequest>) -> Result<LlmStream, LlmError> {
        let call = self.resolve(request.into())?;
        let wire = wire_format(call.provider.dialect);

        let url = wire.endpoint(&call.base_url);
        let headers = wire.headers(&call.api_key);
        let body = wire.build_body(&call, true);

        debug!(
            provider = %call.provider.name,
            model = %call.model,
            messages = call.messages.len(),
            "Sending streaming chat request"
        );

        let header_refs: Vec<(&str, &str)> =
            headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let bytes = self
            .http
            .post_json_stream(&url, header_refs, &body)
            .await
            .map_err(|e| {
                warn!(provider = %call.provider.name, error = %e, "Streaming request failed");
                e
            })?;

        let mut reported: Option<Usage> = None;

        let chunks = sse_events(bytes)
            .and_then(move |data| ready(wire.parse_event(&data)))
            .try_take_while(|event| ready(Ok::<bool, LlmError>(!matches!(event, StreamEvent::Done))))
            .try_filter_map(move |event| {
                ready(Ok(match event {
                    StreamEvent::Chunk(mut chunk) => {
                        if let Some(usage) = chunk.usage.take() {
                            let usage = combine_usage(reported.as_ref(), usage);
                            reported = Some(usage.clone());
                            chunk.usage = Some(usage);
                        }
                        Some(chunk)
                    }
                    StreamEvent::Usage(usage) => {
                        reported = Some(combine_usage(reported.as_ref(), usage));
                        None
                    }
                    StreamEvent::Skip | StreamEvent::Done => None,
                }))
            });

        Ok(Box::pin(chunks))
    }

    /// Run several chats with at most `max_concurrency` in flight; results keep input order.
    pub async fn batch_async(&self, requests: Vec<LlmRequest>) -> Vec<Result<Response, LlmError>> {
        debug!(count = requests.len(), limit = self.max_concurrency, "Running batch");

        stream::iter(requests)
            .map(|request| self.chat_async(request))
            .buffered(self.max_concurrency.max(1))
            .collect()
            .await
    }

    /// Blocking [`Llm::chat_async`]; must not be called from inside an async runtime.
    pub fn chat(&self, request: impl Into<LlmRequest>) -> Result<Response, LlmError> {
        block_on(self.chat_async(request))?
    }

    /// Blocking [`Llm::stream_async`]; must not be called from inside an async runtime.
    pub fn stream(&self, request: impl Into<LlmRequest>) -> Result<ChunkIter, LlmError> {
        let stream = block_on(self.stream_async(request))??;
        Ok(ChunkIter::new(stream))
    }

    /// Blocking [`Llm::batch_async`]
    pub fn batch(
        &self,
        requests: Vec<LlmRequest>,
    ) -> Result<Vec<Result<Response, LlmError>>, LlmError> {
        block_on(self.batch_async(requests))
    }
}

/// Builder for [`Llm`]; unset fields come from the defaults and the provider table
#[derive(Debug, Default)]
pub struct LlmBuilder {
    provider: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    temperature: Option<f32>,
    response_format: Option<ResponseFormat>,
    max_completion_tokens: Option<u32>,
    reasoning_effort: Option<String>,
    extra_params: Map<String, Value>,
    defaults: Option<LlmDefaults>,
    registry: Option<Arc<ProviderRegistry>>,
    http_client: Option<Arc<dyn HttpClientTrait>>,
}

impl LlmBuilder {
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn max_completion_tokens(mut self, tokens: u32) -> Self {
        self.max_completion_tokens = Some(tokens);
        self
    }

    pub fn reasoning_effort(mut self, effort: impl Into<String>) -> Self {
        self.reasoning_effort = Some(effort.into());
        self
    }

    pub fn extra_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_params.insert(key.into(), value.into());
        self
    }

    pub fn defaults(mut self, defaults: LlmDefaults) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn registry(mut self, registry: Arc<ProviderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn http_client(mut self, http_client: Arc<dyn HttpClientTrait>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn build(self) -> Result<Llm, LlmError> {
        let defaults = self.defaults.unwrap_or_default();
        let registry = self.registry.unwrap_or_else(ProviderRegistry::shared);

        let provider_name = self.provider.unwrap_or_else(|| defaults.provider.clone());
        let provider = registry.lookup(&provider_name)?;

        let http = match self.http_client {
            Some(http) => http,
            None => Arc::new(HttpClient::with_timeout(defaults.timeout)?),
        };

        let config = LlmConfig {
            provider: provider.name.clone(),
            model: self
                .model
                .unwrap_or_else(|| provider.default_model.clone()),
            api_key: self.api_key,
            base_url: self.base_url,
            temperature: self.temperature.unwrap_or(defaults.temperature),
            response_format: self.response_format,
            max_completion_tokens: self.max_completion_tokens,
            reasoning_effort: self.reasoning_effort,
            extra_params: self.extra_params,
        };

        debug!(provider = %config.provider, model = %config.model, "LLM client created");

        Ok(Llm {
            config,
            provider,
            registry,
            http,
            max_concurrency: defaults.max_concurrency,
        })
    }
}
