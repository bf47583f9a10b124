//! ViaCEP postal code client.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::client::AddressLookup;
use super::error::LookupError;
use crate::types::{Address, Cep};

pub const VIACEP_URL: &str = "https://viacep.com.br";

const SERVICE: &str = "viacep";

/// ViaCEP client.
pub struct ViaCepClient {
    client: Client,
    base_url: String,
}

impl ViaCepClient {
    pub fn new() -> Self {
        Self::with_base_url(VIACEP_URL, Duration::from_secs(10))
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(concat!("rateio-cli/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .expect("failed to build http client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, cep: &Cep) -> Result<Url, LookupError> {
        Ok(Url::parse(&format!("{}/ws/{}/json/", self.base_url, cep.digits()))?)
    }
}

impl Default for ViaCepClient {
    fn default() -> Self {
        Self::new()
    }
}

// ViaCEP answers 200 with `{"erro": true}` (or `"true"`) for unknown CEPs.
#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    complemento: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
}

fn parse_response(cep: &Cep, body: &str) -> Result<Option<Address>, LookupError> {
    let resp: ViaCepResponse = serde_json::from_str(body)?;
    if resp.erro.is_some() {
        return Ok(None);
    }
    if resp.localidade.is_empty() || resp.uf.is_empty() {
        return Err(LookupError::Malformed {
            service: SERVICE,
            reason: "missing city or state".to_string(),
        });
    }
    Ok(Some(Address {
        cep: Some(cep.clone()),
        street: resp.logradouro,
        number: String::new(),
        complement: Some(resp.complemento).filter(|c| !c.is_empty()),
        neighborhood: resp.bairro,
        city: resp.localidade,
        state: resp.uf,
    }))
}

impl AddressLookup for ViaCepClient {
    async fn lookup_cep(&self, cep: &Cep) -> Result<Option<Address>, LookupError> {
        let url = self.url_for(cep)?;
        debug!(cep = %cep, url = %url, "looking up cep");

        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                warn!(cep = %cep, "cep not found");
                return Ok(None);
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(LookupError::RateLimited),
            status => {
                return Err(LookupError::UnexpectedStatus {
                    service: SERVICE,
                    status: status.as_u16(),
                });
            }
        }

        let body = response.text().await?;
        let address = parse_response(cep, &body)?;
        if address.is_none() {
            warn!(cep = %cep, "cep not found");
        }
        Ok(address)
    }
}
