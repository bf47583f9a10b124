//! Rateio CLI - subscriber, generator and energy allocation management for
//! shared solar generation.

mod allocation;
mod billing;
mod cli;
mod commands;
mod forms;
mod local;
mod lookup;
mod types;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Controlled by RUST_LOG; wizards read stdin, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    cli.command.execute().await
}
