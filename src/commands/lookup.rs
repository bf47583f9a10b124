//! Lookup command - query the CEP and CNPJ registries.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::local::LocalConfig;
use crate::lookup::{AddressLookup, CompanyLookup, LookupClients};
use crate::types::{Address, Cep, Document};

use super::output::{OutputFormat, emit};

#[derive(Args)]
pub struct LookupCmd {
    #[command(subcommand)]
    pub command: LookupSubCmd,
}

#[derive(Subcommand)]
pub enum LookupSubCmd {
    /// Look up one or more CEPs
    Cep(CepCmd),

    /// Look up a company by CNPJ
    Cnpj(CnpjCmd),
}

#[derive(Args)]
pub struct CepCmd {
    #[arg(required = true)]
    pub ceps: Vec<String>,

    /// Number of lookups to run concurrently
    #[arg(long, short = 'j', default_value = "4")]
    pub concurrency: usize,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct CnpjCmd {
    pub cnpj: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct CepResult {
    cep: String,
    address: Option<Address>,
    error: Option<String>,
}

impl LookupCmd {
    pub async fn run(&self) -> Result<()> {
        let config = LocalConfig::load()?;
        let clients = LookupClients::from_config(&config);

        match &self.command {
            LookupSubCmd::Cep(cmd) => cmd.run(&clients).await,
            LookupSubCmd::Cnpj(cmd) => cmd.run(&clients).await,
        }
    }
}

impl CepCmd {
    async fn run(&self, clients: &LookupClients) -> Result<()> {
        let results: Vec<CepResult> = stream::iter(self.ceps.iter())
            .map(|raw| async move {
                match raw.parse::<Cep>() {
                    Ok(cep) => match clients.address.lookup_cep(&cep).await {
                        Ok(address) => CepResult {
                            cep: cep.to_string(),
                            address,
                            error: None,
                        },
                        Err(e) => CepResult {
                            cep: cep.to_string(),
                            address: None,
                            error: Some(e.to_string()),
                        },
                    },
                    Err(e) => CepResult {
                        cep: raw.clone(),
                        address: None,
                        error: Some(e.to_string()),
                    },
                }
            })
            .buffered(self.concurrency.max(1))
            .collect()
            .await;

        if emit(self.format, &results)? {
            return Ok(());
        }

        for r in &results {
            match (&r.address, &r.error) {
                (Some(address), _) => println!("{}  {}", r.cep, address.one_line()),
                (None, Some(error)) => println!("{}  error: {}", r.cep, error),
                (None, None) => println!("{}  not found", r.cep),
            }
        }
        Ok(())
    }
}

impl CnpjCmd {
    async fn run(&self, clients: &LookupClients) -> Result<()> {
        let document: Document = self.cnpj.parse().context("Invalid CNPJ")?;
        let Some(info) = clients.company.lookup_cnpj(&document).await? else {
            println!("CNPJ {} not found.", document);
            return Ok(());
        };

        if emit(self.format, &info)? {
            return Ok(());
        }

        println!("CNPJ:        {}", info.cnpj);
        println!("Legal name:  {}", info.legal_name);
        if let Some(trade_name) = &info.trade_name {
            println!("Trade name:  {}", trade_name);
        }
        println!(
            "Status:      {}{}",
            info.status.as_deref().unwrap_or("-"),
            if info.is_active() { "" } else { " (inactive)" }
        );
        if !info.address.is_blank() {
            println!("Address:     {}", info.address.one_line());
        }
        if let Some(email) = &info.email {
            println!("E-mail:      {}", email);
        }
        if let Some(phone) = &info.phone {
            println!("Phone:       {}", phone);
        }
        Ok(())
    }
}
