//! Infrastructure layer - HTTP transport, provider dialects and logging

pub mod llm;
pub mod logging;
