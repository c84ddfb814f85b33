use std::time::Duration;

use serde::Deserialize;

use crate::chatbot::ChatbotOptions;
use crate::domain::llm::ResponseFormat;
use crate::infrastructure::llm::LlmDefaults;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub agent: AgentSettings,
    pub chatbot: ChatbotSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub default_provider: String,
    /// Overrides the provider's default model
    pub model: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub instruction: String,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatbotSettings {
    pub stream: bool,
    pub display_stats: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let defaults = LlmDefaults::default();

        Self {
            default_provider: defaults.provider,
            model: None,
            temperature: defaults.temperature,
            timeout_secs: defaults.timeout.as_secs(),
            max_concurrency: defaults.max_concurrency,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            instruction:
                "You are a helpful assistant. Answer the user's questions clearly and concisely."
                    .to_string(),
            response_format: ResponseFormat::Text,
        }
    }
}

impl Default for ChatbotSettings {
    fn default() -> Self {
        let options = ChatbotOptions::default();

        Self {
            stream: options.stream,
            display_stats: options.display_stats,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LlmSettings {
    /// Client construction defaults derived from these settings
    pub fn defaults(&self) -> LlmDefaults {
        LlmDefaults {
            provider: self.default_provider.clone(),
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
            max_concurrency: self.max_concurrency,
        }
    }
}

impl ChatbotSettings {
    pub fn options(&self) -> ChatbotOptions {
        ChatbotOptions {
            stream: self.stream,
            display_stats: self.display_stats,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("AGENTINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.llm.default_provider, "openai");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.llm.max_concurrency, 100);
        assert!(config.llm.model.is_none());
        assert_eq!(config.agent.response_format, ResponseFormat::Text);
        assert!(config.chatbot.stream);
        assert!(!config.chatbot.display_stats);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_llm_settings_to_defaults() {
        let settings = LlmSettings {
            default_provider: "groq".to_string(),
            timeout_secs: 5,
            ..Default::default()
        };

        let defaults = settings.defaults();

        assert_eq!(defaults.provider, "groq");
        assert_eq!(defaults.timeout, Duration::from_secs(5));
        assert_eq!(defaults.temperature, 1.0);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agentine.toml");
        std::fs::write(
            &path,
            "[llm]\ndefault_provider = \"anthropic\"\n\n[chatbot]\ndisplay_stats = true\n",
        )
        .unwrap();

        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.llm.default_provider, "anthropic");
        assert_eq!(config.llm.temperature, 1.0);
        assert!(config.chatbot.display_stats);
        assert!(config.chatbot.stream);
        assert_eq!(config.agent.response_format, ResponseFormat::Text);
    }
}
