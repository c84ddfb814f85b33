//! Chat command - interactive agent session on stdin/stdout

use tracing::{info, warn};

use crate::agent::Agent;
use crate::chatbot::Chatbot;
use crate::config::AppConfig;
use crate::infrastructure::llm::Llm;
use crate::infrastructure::logging;

/// Run an interactive chat with the configured agent
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let (config, load_error) = config_or_default(AppConfig::load());
    logging::init_logging(&config.logging);

    if let Some(e) = load_error {
        warn!(error = %e, "Invalid configuration; using defaults");
    }

    let llm = build_llm(&config)?;

    info!(provider = %llm.provider(), model = %llm.model(), "Starting chat");
    if llm.api_key().is_none() {
        warn!(
            env_var = %llm.provider_config().api_key_env_var,
            "No API key found; requests will fail until it is set"
        );
    }

    let agent = Agent::new(config.agent.instruction.clone(), llm)
        .with_name("assistant")
        .with_response_format(config.agent.response_format);

    let mut chatbot = Chatbot::new(agent, config.chatbot.options());
    chatbot.cli_run().await?;

    Ok(())
}

/// Fall back to defaults on a bad config, keeping the error to report once logging is up
fn config_or_default(
    loaded: Result<AppConfig, config::ConfigError>,
) -> (AppConfig, Option<config::ConfigError>) {
    match loaded {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    }
}

fn build_llm(config: &AppConfig) -> anyhow::Result<Llm> {
    let mut builder = Llm::builder().defaults(config.llm.defaults());

    if let Some(ref model) = config.llm.model {
        builder = builder.model(model);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_llm_from_config() {
        let mut config = AppConfig::default();
        config.llm.default_provider = "mistral".to_string();
        config.llm.model = Some("mistral-small".to_string());
        config.llm.temperature = 0.4;

        let llm = build_llm(&config).unwrap();

        assert_eq!(llm.provider(), "mistral");
        assert_eq!(llm.model(), "mistral-small");
        assert_eq!(llm.temperature(), 0.4);
        assert_eq!(llm.base_url(), "https://api.mistral.ai/v1");
    }

    #[test]
    fn test_build_llm_unknown_provider() {
        let mut config = AppConfig::default();
        config.llm.default_provider = "acme".to_string();

        let error = build_llm(&config).unwrap_err();

        assert!(error.to_string().contains("Unknown provider 'acme'"));
    }

    #[test]
    fn test_invalid_config_falls_back_and_keeps_error() {
        let (config, error) =
            config_or_default(Err(config::ConfigError::Message("invalid temperature".into())));

        assert_eq!(config.llm.default_provider, "openai");
        assert!(error.unwrap().to_string().contains("invalid temperature"));

        let (config, error) = config_or_default(Ok(AppConfig::default()));
        assert_eq!(config.llm.timeout_secs, 60);
        assert!(error.is_none());
    }
}
