use agentine::cli::{self, Cli};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _cli = Cli::parse();

    cli::chat::run().await
}
