//! Config command - manage local configuration.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::local::LocalConfig;
use crate::lookup::LookupProvider;

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub command: ConfigSubCmd,
}

#[derive(Subcommand)]
pub enum ConfigSubCmd {
    /// Choose the CEP lookup service (default: viacep)
    SetProvider(SetProviderCmd),

    /// Set the bearer token for the CNPJ registry (empty to clear)
    SetToken(SetTokenCmd),

    /// Set how far the percentage total may drift from 100 (default: 0.01)
    SetTolerance(SetToleranceCmd),

    /// Set the default tariff in BRL/kWh used for invoices
    SetTariff(SetTariffCmd),

    /// Show current configuration
    Show,
}

#[derive(Args)]
pub struct SetProviderCmd {
    #[arg(value_enum)]
    pub provider: LookupProvider,
}

#[derive(Args)]
pub struct SetTokenCmd {
    pub token: String,
}

#[derive(Args)]
pub struct SetToleranceCmd {
    /// Tolerance in percentage points, e.g. 0.01
    pub tolerance: f64,
}

#[derive(Args)]
pub struct SetTariffCmd {
    /// Tariff in BRL per kWh, e.g. 0.92
    pub tariff: f64,
}

impl ConfigCmd {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            ConfigSubCmd::SetProvider(cmd) => {
                let mut config = LocalConfig::load()?;
                config.lookup_provider = cmd.provider;
                config.save()?;
                println!("CEP lookups now use: {}", cmd.provider);
            }
            ConfigSubCmd::SetToken(cmd) => {
                let mut config = LocalConfig::load()?;
                config.cnpj_api_token = Some(cmd.token.clone()).filter(|t| !t.is_empty());
                config.save()?;
                if config.has_cnpj_token() {
                    println!("CNPJ token saved.");
                } else {
                    println!("CNPJ token cleared.");
                }
            }
            ConfigSubCmd::SetTolerance(cmd) => {
                let mut config = LocalConfig::load()?;
                config.set_percentage_tolerance(cmd.tolerance)?;
                config.save()?;
                println!("Percentage tolerance set to: {}", cmd.tolerance);
            }
            ConfigSubCmd::SetTariff(cmd) => {
                let mut config = LocalConfig::load()?;
                config.set_default_tariff(cmd.tariff)?;
                config.save()?;
                println!("Default tariff set to: R$ {:.4}/kWh", cmd.tariff);
            }
            ConfigSubCmd::Show => {
                let config = LocalConfig::load()?;
                println!("Config: {}", LocalConfig::config_path()?.display());
                println!();
                println!("lookup_provider:   {}", config.lookup_provider);
                println!("viacep_url:        {}", config.viacep_base_url);
                println!("brasilapi_url:     {}", config.brasilapi_base_url);
                println!(
                    "cnpj_token:        {}",
                    if config.has_cnpj_token() {
                        "(set)"
                    } else {
                        "(not set)"
                    }
                );
                println!("lookup_timeout:    {}s", config.lookup_timeout_secs);
                println!("pct_tolerance:     {}", config.percentage_tolerance);
                println!("default_tariff:    R$ {:.4}/kWh", config.default_tariff);
                println!("default_commission: {}%", config.default_commission_pct);
            }
        }
        Ok(())
    }
}
