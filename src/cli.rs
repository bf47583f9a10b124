//! CLI argument definitions.

use clap::{Parser, Subcommand};

use crate::commands::{
    ConfigCmd, GeneratorCmd, InitCmd, InvoiceCmd, LookupCmd, RateioCmd, RepresentativeCmd,
    StatusCmd, SubscriberCmd,
};

#[derive(Parser)]
#[command(name = "rateio")]
#[command(about = "Rateio - share solar generation among subscribers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a .rateio workspace in the current directory
    Init(InitCmd),

    /// Show workspace totals
    Status(StatusCmd),

    /// Register and inspect subscribers
    #[command(alias = "assinante")]
    Subscriber(SubscriberCmd),

    /// Register and maintain generators
    #[command(alias = "usina")]
    Generator(GeneratorCmd),

    /// Preview, save and complete energy allocations
    Rateio(RateioCmd),

    /// Bill subscribers for compensated energy
    #[command(alias = "fatura")]
    Invoice(InvoiceCmd),

    /// Sales representatives and commissions
    #[command(alias = "representante")]
    Representative(RepresentativeCmd),

    /// Query CEP and CNPJ registries
    Lookup(LookupCmd),

    /// Manage configuration (lookup provider, defaults, tokens)
    Config(ConfigCmd),
}

impl Command {
    pub async fn execute(&self) -> anyhow::Result<()> {
        match self {
            Command::Init(cmd) => cmd.run().await,
            Command::Status(cmd) => cmd.run().await,
            Command::Subscriber(cmd) => cmd.run().await,
            Command::Generator(cmd) => cmd.run().await,
            Command::Rateio(cmd) => cmd.run().await,
            Command::Invoice(cmd) => cmd.run().await,
            Command::Representative(cmd) => cmd.run().await,
            Command::Lookup(cmd) => cmd.run().await,
            Command::Config(cmd) => cmd.run().await,
        }
    }
}
