//! Local configuration management.
//!
//! Config is stored at `~/.config/rateio/config.toml` and contains:
//! - lookup provider and service URLs
//! - an optional token for the CNPJ registry
//! - allocation and billing defaults

use std::path::PathBuf;

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::allocation::DEFAULT_TOLERANCE;
use crate::lookup::{BRASILAPI_URL, LookupProvider, VIACEP_URL};

const CONFIG_DIR: &str = "rateio";
const CONFIG_FILE: &str = "config.toml";

/// Local configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Service used for CEP lookups.
    #[serde(default)]
    pub lookup_provider: LookupProvider,

    #[serde(default = "default_viacep_base_url")]
    pub viacep_base_url: String,

    #[serde(default = "default_brasilapi_base_url")]
    pub brasilapi_base_url: String,

    /// Bearer token for the CNPJ registry, if the mirror needs one.
    #[serde(default)]
    pub cnpj_api_token: Option<String>,

    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,

    /// Allowed drift of the percentage sum around 100.
    #[serde(default = "default_percentage_tolerance")]
    pub percentage_tolerance: f64,

    /// Utility tariff in BRL/kWh used when an invoice does not give one.
    #[serde(default = "default_tariff")]
    pub default_tariff: f64,

    /// Commission for new representatives, in percent.
    #[serde(default = "default_commission_pct")]
    pub default_commission_pct: f64,
}

fn default_viacep_base_url() -> String {
    VIACEP_URL.to_string()
}

fn default_brasilapi_base_url() -> String {
    BRASILAPI_URL.to_string()
}

fn default_lookup_timeout_secs() -> u64 {
    10
}

fn default_percentage_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_tariff() -> f64 {
    0.85
}

fn default_commission_pct() -> f64 {
    5.0
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            lookup_provider: LookupProvider::default(),
            viacep_base_url: default_viacep_base_url(),
            brasilapi_base_url: default_brasilapi_base_url(),
            cnpj_api_token: None,
            lookup_timeout_secs: default_lookup_timeout_secs(),
            percentage_tolerance: default_percentage_tolerance(),
            default_tariff: default_tariff(),
            default_commission_pct: default_commission_pct(),
        }
    }
}

impl LocalConfig {
    /// Load config from the default location.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&path, content).context("Failed to write config file")
    }

    /// Get the CNPJ registry token as a SecretString.
    pub fn cnpj_api_token_secret(&self) -> Option<SecretString> {
        self.cnpj_api_token
            .clone()
            .filter(|t| !t.is_empty())
            .map(SecretString::from)
    }

    pub fn has_cnpj_token(&self) -> bool {
        self.cnpj_api_token_secret().is_some()
    }

    /// Set the percentage tolerance. Must be in `[0, 1]`.
    pub fn set_percentage_tolerance(&mut self, tolerance: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&tolerance) {
            anyhow::bail!("Tolerance must be between 0 and 1 percentage points");
        }
        self.percentage_tolerance = tolerance;
        Ok(())
    }

    pub fn set_default_tariff(&mut self, tariff: f64) -> Result<()> {
        if !(tariff > 0.0 && tariff.is_finite()) {
            anyhow::bail!("Tariff must be a positive number of BRL per kWh");
        }
        self.default_tariff = tariff;
        Ok(())
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }
}
