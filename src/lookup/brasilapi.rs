//! BrasilAPI client (CEP v1 and CNPJ v1).

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::client::{AddressLookup, CompanyInfo, CompanyLookup};
use super::error::LookupError;
use crate::types::{Address, Cep, Document};

pub const BRASILAPI_URL: &str = "https://brasilapi.com.br";

const SERVICE: &str = "brasilapi";

/// BrasilAPI client.
pub struct BrasilApiClient {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
}

impl BrasilApiClient {
    pub fn new() -> Self {
        Self::with_base_url(BRASILAPI_URL, Duration::from_secs(10), None)
    }

    /// `token` is sent as a bearer token, for mirrors that require one.
    pub fn with_base_url(base_url: &str, timeout: Duration, token: Option<SecretString>) -> Self {
        let client = Client::builder()
            .user_agent(concat!("rateio-cli/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .expect("failed to build http client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> Result<Url, LookupError> {
        Ok(Url::parse(&format!("{}/api/{}", self.base_url, path))?)
    }

    fn get(&self, url: Url) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Fetch a body, mapping 404 to `None`.
    async fn fetch(&self, url: Url) -> Result<Option<String>, LookupError> {
        let response = self.get(url).send().await?;
        match response.status() {
            StatusCode::OK => Ok(Some(response.text().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::TOO_MANY_REQUESTS => Err(LookupError::RateLimited),
            status => Err(LookupError::UnexpectedStatus {
                service: SERVICE,
                status: status.as_u16(),
            }),
        }
    }
}

impl Default for BrasilApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CepResponse {
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    neighborhood: Option<String>,
    city: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct CnpjResponse {
    razao_social: String,
    #[serde(default)]
    nome_fantasia: Option<String>,
    #[serde(default)]
    descricao_situacao_cadastral: Option<String>,
    #[serde(default)]
    descricao_tipo_de_logradouro: Option<String>,
    #[serde(default)]
    logradouro: Option<String>,
    #[serde(default)]
    numero: Option<String>,
    #[serde(default)]
    complemento: Option<String>,
    #[serde(default)]
    bairro: Option<String>,
    #[serde(default)]
    municipio: Option<String>,
    #[serde(default)]
    uf: Option<String>,
    #[serde(default)]
    cep: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    ddd_telefone_1: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_cep(cep: &Cep, body: &str) -> Result<Address, LookupError> {
    let resp: CepResponse = serde_json::from_str(body)?;
    Ok(Address {
        cep: Some(cep.clone()),
        street: resp.street.unwrap_or_default(),
        number: String::new(),
        complement: None,
        neighborhood: resp.neighborhood.unwrap_or_default(),
        city: resp.city,
        state: resp.state,
    })
}

fn parse_cnpj(cnpj: &Document, body: &str) -> Result<CompanyInfo, LookupError> {
    let resp: CnpjResponse = serde_json::from_str(body)?;

    let street = match (
        non_empty(resp.descricao_tipo_de_logradouro),
        non_empty(resp.logradouro),
    ) {
        (Some(kind), Some(name)) => format!("{} {}", kind, name),
        (None, Some(name)) => name,
        _ => String::new(),
    };

    Ok(CompanyInfo {
        cnpj: cnpj.clone(),
        legal_name: resp.razao_social,
        trade_name: non_empty(resp.nome_fantasia),
        status: non_empty(resp.descricao_situacao_cadastral),
        address: Address {
            // Registry data is not always clean; drop what does not parse.
            cep: resp.cep.and_then(|c| c.parse().ok()),
            street,
            number: resp.numero.unwrap_or_default(),
            complement: non_empty(resp.complemento),
            neighborhood: resp.bairro.unwrap_or_default(),
            city: resp.municipio.unwrap_or_default(),
            state: resp.uf.unwrap_or_default(),
        },
        email: non_empty(resp.email).map(|e| e.to_lowercase()),
        phone: resp.ddd_telefone_1.and_then(|p| p.parse().ok()),
    })
}

impl AddressLookup for BrasilApiClient {
    async fn lookup_cep(&self, cep: &Cep) -> Result<Option<Address>, LookupError> {
        let url = self.url(&format!("cep/v1/{}", cep.digits()))?;
        debug!(cep = %cep, url = %url, "looking up cep");

        match self.fetch(url).await? {
            Some(body) => Ok(Some(parse_cep(cep, &body)?)),
            None => {
                warn!(cep = %cep, "cep not found");
                Ok(None)
            }
        }
    }
}

impl CompanyLookup for BrasilApiClient {
    async fn lookup_cnpj(&self, cnpj: &Document) -> Result<Option<CompanyInfo>, LookupError> {
        if !cnpj.is_company() {
            return Err(LookupError::Unsupported(
                "registry lookup is only available for CNPJ".to_string(),
            ));
        }
        let url = self.url(&format!("cnpj/v1/{}", cnpj.digits()))?;
        debug!(cnpj = %cnpj, url = %url, "looking up cnpj");

        match self.fetch(url).await? {
            Some(body) => Ok(Some(parse_cnpj(cnpj, &body)?)),
            None => {
                warn!(cnpj = %cnpj, "cnpj not found");
                Ok(None)
            }
        }
    }
}
