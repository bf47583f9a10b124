//! Address and document lookup adapters.
//!
//! Thin async clients over public Brazilian registries:
//! - CEP → address (ViaCEP or BrasilAPI)
//! - CNPJ → company registry data (BrasilAPI)
//!
//! Unknown codes come back as `Ok(None)` and are logged; only transport or
//! protocol problems are errors.
//!
//! # Example
//!
//! ```ignore
//! use crate::lookup::{AddressLookup, LookupClients};
//!
//! let clients = LookupClients::from_config(&config);
//! let address = clients.address.lookup_cep(&"01001-000".parse()?).await?;
//! ```

mod brasilapi;
mod client;
mod error;
mod viacep;

pub use brasilapi::{BRASILAPI_URL, BrasilApiClient};
pub use client::{AddressLookup, CompanyInfo, CompanyLookup};
pub use error::LookupError;
pub use viacep::{VIACEP_URL, ViaCepClient};

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::local::LocalConfig;
use crate::types::{Address, Cep};

/// Which service answers CEP lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LookupProvider {
    #[default]
    Viacep,
    Brasilapi,
}

impl LookupProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupProvider::Viacep => "viacep",
            LookupProvider::Brasilapi => "brasilapi",
        }
    }
}

impl std::fmt::Display for LookupProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// CEP client that dispatches to the configured provider.
pub enum AddressClient {
    ViaCep(ViaCepClient),
    BrasilApi(BrasilApiClient),
}

impl AddressLookup for AddressClient {
    async fn lookup_cep(&self, cep: &Cep) -> Result<Option<Address>, LookupError> {
        match self {
            Self::ViaCep(c) => c.lookup_cep(cep).await,
            Self::BrasilApi(c) => c.lookup_cep(cep).await,
        }
    }
}

/// All lookup clients, built from configuration.
pub struct LookupClients {
    pub address: AddressClient,
    pub company: BrasilApiClient,
}

impl LookupClients {
    pub fn from_config(config: &LocalConfig) -> Self {
        let timeout = Duration::from_secs(config.lookup_timeout_secs);
        let company = BrasilApiClient::with_base_url(
            &config.brasilapi_base_url,
            timeout,
            config.cnpj_api_token_secret(),
        );
        let address = match config.lookup_provider {
            LookupProvider::Viacep => {
                AddressClient::ViaCep(ViaCepClient::with_base_url(&config.viacep_base_url, timeout))
            }
            LookupProvider::Brasilapi => AddressClient::BrasilApi(BrasilApiClient::with_base_url(
                &config.brasilapi_base_url,
                timeout,
                config.cnpj_api_token_secret(),
            )),
        };
        Self { address, company }
    }
}
