//! CLI module for agentine
//!
//! The binary has no behavioral flags: provider, model and chat options come from
//! `config/default`, `config/local` and `AGENTINE__*` environment variables.

pub mod chat;

use clap::Parser;

/// agentine - chat with an AI agent from the terminal
#[derive(Parser)]
#[command(name = "agentine")]
#[command(version, about, long_about = None)]
pub struct Cli {}
