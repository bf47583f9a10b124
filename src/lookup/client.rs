//! Lookup traits and common types.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::types::{Address, Cep, Document, Phone};

use super::error::LookupError;

/// Registry data about a company, keyed by CNPJ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub cnpj: Document,
    /// Razão social.
    pub legal_name: String,
    /// Nome fantasia.
    pub trade_name: Option<String>,
    /// Registration status as reported, e.g. "ATIVA".
    pub status: Option<String>,
    pub address: Address,
    pub email: Option<String>,
    pub phone: Option<Phone>,
}

impl CompanyInfo {
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("ativa"))
            .unwrap_or(true)
    }
}

/// Postal code to address.
///
/// `Ok(None)` means the service answered but does not know the CEP; that
/// is a soft failure and callers leave the fields for manual entry.
pub trait AddressLookup: Send + Sync {
    fn lookup_cep(&self, cep: &Cep) -> impl Future<Output = Result<Option<Address>, LookupError>> + Send;
}

/// CNPJ to company registry data. `Ok(None)` when the CNPJ is unknown.
pub trait CompanyLookup: Send + Sync {
    fn lookup_cnpj(
        &self,
        cnpj: &Document,
    ) -> impl Future<Output = Result<Option<CompanyInfo>, LookupError>> + Send;
}
