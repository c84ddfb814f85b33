//! Provider table: where each vendor lives, which model it defaults to, where its key comes from

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::LlmError;

/// Wire format family spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `POST {base}/chat/completions` with the OpenAI chat schema
    OpenAiCompatible,
    /// `POST {base}/v1/messages` with the Anthropic messages schema
    Anthropic,
}

/// Static description of one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    pub default_model: String,
    pub api_key_env_var: String,
    pub dialect: Dialect,
}

impl ProviderConfig {
    /// An OpenAI-compatible provider
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
        api_key_env_var: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into().to_lowercase(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_model: default_model.into(),
            api_key_env_var: api_key_env_var.into(),
            dialect: Dialect::OpenAiCompatible,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Read this provider's API key from its environment variable; empty values count as unset.
    pub fn api_key_from_env(&self) -> Option<String> {
        non_blank(std::env::var(&self.api_key_env_var).ok())
    }
}

fn non_blank(key: Option<String>) -> Option<String> {
    key.filter(|key| !key.trim().is_empty())
}

static BUILTIN: Lazy<Arc<ProviderRegistry>> = Lazy::new(|| Arc::new(ProviderRegistry::builtin()));

/// Lookup table of providers keyed by lower-case name
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderConfig>,
}

impl ProviderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in provider
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register(ProviderConfig::new(
            "openai",
            "https://api.openai.com/v1",
            "gpt-5-chat-latest",
            "OPENAI_API_KEY",
        ));
        registry.register(ProviderConfig::new(
            "groq",
            "https://api.groq.com/openai/v1",
            "llama-3.3-70b-versatile",
            "GROQ_API_KEY",
        ));
        registry.register(ProviderConfig::new(
            "gemini",
            "https://generativelanguage.googleapis.com/v1beta/openai",
            "gemini-2.5-flash-lite",
            "GEMINI_API_KEY",
        ));
        registry.register(ProviderConfig::new(
            "perplexity",
            "https://api.perplexity.ai",
            "sonar",
            "PERPLEXITY_API_KEY",
        ));
        registry.register(
            ProviderConfig::new(
                "anthropic",
                "https://api.anthropic.com",
                "claude-sonnet-4-20250514",
                "ANTHROPIC_API_KEY",
            )
            .with_dialect(Dialect::Anthropic),
        );
        registry.register(ProviderConfig::new(
            "xai",
            "https://api.x.ai/v1",
            "grok-3-mini",
            "XAI_API_KEY",
        ));
        registry.register(ProviderConfig::new(
            "deepseek",
            "https://api.deepseek.com",
            "deepseek-chat",
            "DEEPSEEK_API_KEY",
        ));
        registry.register(ProviderConfig::new(
            "mistral",
            "https://api.mistral.ai/v1",
            "mistral-medium",
            "MISTRAL_API_KEY",
        ));
        registry.register(ProviderConfig::new(
            "cohere",
            "https://api.cohere.ai/compatibility/v1",
            "command-r",
            "COHERE_API_KEY",
        ));

        registry
    }

    /// The process-wide built-in table, shared read-only
    pub fn shared() -> Arc<Self> {
        BUILTIN.clone()
    }

    /// Add a provider, replacing any entry with the same name
    pub fn register(&mut self, config: ProviderConfig) {
        self.providers.insert(config.name.to_lowercase(), config);
    }

    pub fn lookup(&self, name: &str) -> Result<ProviderConfig, LlmError> {
        self.providers
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| LlmError::unknown_provider(name, &self.names()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(&name.to_lowercase())
    }

    /// Registered provider names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}
