//! Application configuration loaded from files and the environment

mod app_config;

pub use app_config::{
    AgentSettings, AppConfig, ChatbotSettings, LlmSettings, LogFormat, LoggingConfig,
};
