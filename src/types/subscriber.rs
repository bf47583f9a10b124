use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cep, Document, Phone, RepresentativeId, UcCode};

pub type SubscriberId = uuid::Uuid;

/// Whether a subscriber or generator takes part in new allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    #[default]
    Active,
    Inactive,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Active => "active",
            EntityStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" | "ativo" => Ok(EntityStatus::Active),
            "inactive" | "inativo" => Ok(EntityStatus::Inactive),
            _ => Err(format!("unknown status: {}", s)),
        }
    }
}

/// Contract term commitment. Longer terms earn a larger discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Fidelidade {
    #[default]
    None,
    OneYear,
    TwoYears,
}

impl Fidelidade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fidelidade::None => "none",
            Fidelidade::OneYear => "one_year",
            Fidelidade::TwoYears => "two_years",
        }
    }

    /// Default discount on the compensated energy, in percent.
    pub fn discount_pct(&self) -> f64 {
        match self {
            Fidelidade::None => 10.0,
            Fidelidade::OneYear => 15.0,
            Fidelidade::TwoYears => 20.0,
        }
    }
}

impl std::fmt::Display for Fidelidade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Fidelidade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "none" | "sem" => Ok(Fidelidade::None),
            "one_year" | "1y" | "1_ano" => Ok(Fidelidade::OneYear),
            "two_years" | "2y" | "2_anos" => Ok(Fidelidade::TwoYears),
            _ => Err(format!("unknown fidelidade: {}", s)),
        }
    }
}

/// Street address, usually auto-filled from a CEP lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub cep: Option<Cep>,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    /// Two-letter state code (UF).
    pub state: String,
}

impl Address {
    pub fn is_blank(&self) -> bool {
        self.street.is_empty() && self.city.is_empty() && self.state.is_empty()
    }

    pub fn one_line(&self) -> String {
        let mut line = format!("{}, {}", self.street, self.number);
        if let Some(c) = &self.complement {
            line.push_str(&format!(" {}", c));
        }
        line.push_str(&format!(" - {}, {}/{}", self.neighborhood, self.city, self.state));
        if let Some(cep) = &self.cep {
            line.push_str(&format!(" {}", cep));
        }
        line
    }
}

/// The utility account a UC is billed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyAccount {
    pub uc: UcCode,
    /// Distribution utility (concessionária), e.g. "CEMIG".
    pub concessionaria: String,
    pub holder_name: String,
    pub holder_document: Document,
}

/// A customer unit receiving shared energy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub name: String,
    pub document: Document,
    pub email: Option<String>,
    pub phone: Option<Phone>,
    pub address: Address,
    pub account: EnergyAccount,
    /// Contracted monthly consumption in kWh.
    pub consumption_kwh: f64,
    /// Energy credit carried over from earlier periods, in kWh.
    pub accumulated_credit_kwh: f64,
    pub fidelidade: Fidelidade,
    pub discount_pct: f64,
    pub representative_id: Option<RepresentativeId>,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fidelidade_discount_tiers() {
        assert_eq!(Fidelidade::None.discount_pct(), 10.0);
        assert_eq!(Fidelidade::OneYear.discount_pct(), 15.0);
        assert_eq!(Fidelidade::TwoYears.discount_pct(), 20.0);
    }

    #[test]
    fn test_fidelidade_from_str() {
        assert_eq!("two-years".parse::<Fidelidade>().unwrap(), Fidelidade::TwoYears);
        assert_eq!("1y".parse::<Fidelidade>().unwrap(), Fidelidade::OneYear);
        assert!("forever".parse::<Fidelidade>().is_err());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Ativo".parse::<EntityStatus>().unwrap(), EntityStatus::Active);
        assert_eq!("inactive".parse::<EntityStatus>().unwrap(), EntityStatus::Inactive);
    }

    #[test]
    fn test_address_one_line() {
        let address = Address {
            cep: Some("30140-071".parse().unwrap()),
            street: "Rua da Bahia".to_string(),
            number: "1200".to_string(),
            complement: Some("sala 3".to_string()),
            neighborhood: "Centro".to_string(),
            city: "Belo Horizonte".to_string(),
            state: "MG".to_string(),
        };
        assert_eq!(
            address.one_line(),
            "Rua da Bahia, 1200 sala 3 - Centro, Belo Horizonte/MG 30140-071"
        );
        assert!(Address::default().is_blank());
    }
}
