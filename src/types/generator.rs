use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Address, Document, EnergyAccount, EntityStatus, Phone};

pub type GeneratorId = uuid::Uuid;

/// Person responsible for operating a plant on the owner's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Administrator {
    pub name: String,
    pub document: Document,
    pub email: Option<String>,
    pub phone: Option<Phone>,
}

/// A power plant whose output is shared among subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generator {
    pub id: GeneratorId,
    pub nickname: String,
    pub owner_name: String,
    pub owner_document: Document,
    pub account: EnergyAccount,
    pub address: Address,
    pub administrator: Option<Administrator>,
    /// Installed capacity in kWp, informational.
    pub capacity_kwp: Option<f64>,
    /// Projected monthly generation in kWh.
    pub expected_generation_kwh: f64,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
}

impl Generator {
    pub fn is_active(&self) -> bool {
        self.status == EntityStatus::Active
    }
}
