//! Allocation errors, validation issues and warnings.

use serde::Serialize;
use thiserror::Error;

/// A problem that blocks a rateio from being saved.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum RateioIssue {
    #[error("a rateio needs at least one participant")]
    NoParticipants,

    #[error("expected generation must be greater than zero (got {kwh} kWh)")]
    NoGeneration { kwh: f64 },

    #[error("percentages must add up to 100% (currently {total:.2}%)")]
    PercentageSum { total: f64 },

    #[error("percentage for {name} must be between 0% and 100% (got {value}%)")]
    PercentageOutOfRange { name: String, value: f64 },

    #[error("{name} has no priority")]
    MissingPriority { name: String },

    #[error("priority {rank} is used more than once")]
    DuplicatePriority { rank: u32 },

    #[error("priorities must run from 1 to {expected} without gaps (found {rank})")]
    PriorityOutOfSequence { rank: u32, expected: usize },

    #[error("{name} appears more than once")]
    DuplicateSubscriber { name: String },
}

/// Something the operator should look at but that does not block saving.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum RateioWarning {
    /// More energy than the participant can use this period.
    OverAllocation { name: String, allocated: f64, limit: f64 },
    ZeroShare { name: String },
    NothingAllocated { name: String },
    /// Priority rateio left generation on the table.
    Unallocated { kwh: f64 },
}

impl std::fmt::Display for RateioWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateioWarning::OverAllocation {
                name,
                allocated,
                limit,
            } => write!(
                f,
                "{} receives {} kWh but consumption plus credit is only {} kWh",
                name, allocated, limit
            ),
            RateioWarning::ZeroShare { name } => write!(f, "{} has a 0% share", name),
            RateioWarning::NothingAllocated { name } => {
                write!(f, "{} receives no energy at this priority", name)
            }
            RateioWarning::Unallocated { kwh } => {
                write!(f, "{} kWh of generation is not allocated to anyone", kwh)
            }
        }
    }
}

/// Outcome of validating a rateio.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<RateioIssue>,
    pub warnings: Vec<RateioWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error messages as shown to the operator.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages = self.messages();
        write!(f, "{}", messages.join("; "))
    }
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("rateio is not valid: {0}")]
    Invalid(ValidationReport),

    #[error("participant index {index} out of range ({len} participants)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("generator {0} is inactive")]
    InactiveGenerator(String),

    #[error("subscriber {0} is inactive")]
    InactiveSubscriber(String),

    #[error("subscriber {0} is already in this rateio")]
    DuplicateSubscriber(String),

    #[error("invalid period: {0}")]
    InvalidPeriod(String),
}
