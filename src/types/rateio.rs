use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{GeneratorId, SubscriberId, UcCode};

pub type RateioId = uuid::Uuid;

/// How a generator's output is split among participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AllocationKind {
    /// Each participant receives a fixed share of the generation.
    Percentage,
    /// Participants are served in rank order up to their consumption.
    Priority,
}

impl AllocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationKind::Percentage => "percentage",
            AllocationKind::Priority => "priority",
        }
    }
}

impl std::fmt::Display for AllocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AllocationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "percentage" | "porcentagem" | "pct" => Ok(AllocationKind::Percentage),
            "priority" | "prioridade" => Ok(AllocationKind::Priority),
            _ => Err(format!("unknown allocation type: {}", s)),
        }
    }
}

/// Lifecycle of a rateio.
///
/// `Draft` only exists in memory while the operator edits it. Saving moves
/// it to `Pending`; completing it carries leftover credits forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateioStatus {
    #[default]
    Draft,
    Pending,
    Completed,
}

impl RateioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateioStatus::Draft => "draft",
            RateioStatus::Pending => "pending",
            RateioStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for RateioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RateioStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(RateioStatus::Draft),
            "pending" => Ok(RateioStatus::Pending),
            "completed" => Ok(RateioStatus::Completed),
            _ => Err(format!("unknown rateio status: {}", s)),
        }
    }
}

/// One subscriber's share of a rateio.
///
/// The `*_kwh` fields after `remaining_credit_kwh` are derived by the
/// allocation engine and are never set by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub subscriber_id: SubscriberId,
    pub name: String,
    pub uc: UcCode,
    /// Contracted monthly consumption, in whole kWh like every allocation.
    pub consumption_kwh: f64,
    /// Credit carried in from earlier periods, in kWh.
    pub accumulated_credit_kwh: f64,
    /// Share of generation, 0-100. Used by percentage rateios.
    pub percentage: Option<f64>,
    /// Rank starting at 1. Used by priority rateios.
    pub priority: Option<u32>,
    pub allocated_kwh: f64,
    pub credit_used_kwh: f64,
    pub remaining_credit_kwh: f64,
}

impl Participant {
    pub fn new(
        subscriber_id: SubscriberId,
        name: impl Into<String>,
        uc: UcCode,
        consumption_kwh: f64,
        accumulated_credit_kwh: f64,
    ) -> Self {
        Self {
            subscriber_id,
            name: name.into(),
            uc,
            consumption_kwh,
            accumulated_credit_kwh,
            percentage: None,
            priority: None,
            allocated_kwh: 0.0,
            credit_used_kwh: 0.0,
            remaining_credit_kwh: accumulated_credit_kwh,
        }
    }
}

#[cfg(test)]
impl Participant {
    pub fn with_percentage(mut self, pct: f64) -> Self {
        self.percentage = Some(pct);
        self
    }

    pub fn with_priority(mut self, rank: u32) -> Self {
        self.priority = Some(rank);
        self
    }
}

/// A saved distribution of one generator's output for one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rateio {
    pub id: RateioId,
    pub generator_id: GeneratorId,
    pub kind: AllocationKind,
    /// Target period; the day is the reading/billing day.
    pub period: NaiveDate,
    pub expected_generation_kwh: f64,
    /// Generation left after every participant was served.
    pub unallocated_kwh: f64,
    pub participants: Vec<Participant>,
    pub notes: Option<String>,
    /// Storage key of an attached document.
    pub attachment: Option<String>,
    pub status: RateioStatus,
    pub created_at: DateTime<Utc>,
}

impl Rateio {
    pub fn total_allocated_kwh(&self) -> f64 {
        self.participants.iter().map(|p| p.allocated_kwh).sum()
    }
}
