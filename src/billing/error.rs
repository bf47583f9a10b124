use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::types::{InvoiceStatus, ReferenceMonth};

/// A rule an invoice breaks.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvoiceIssue {
    #[error("consumption must be greater than zero (got {kwh} kWh)")]
    NonPositiveConsumption { kwh: f64 },

    #[error("compensated energy {compensated} kWh must be between 0 and the consumption of {consumption} kWh")]
    CompensatedOutOfRange { compensated: f64, consumption: f64 },

    #[error("tariff must be greater than zero (got {tariff})")]
    NonPositiveTariff { tariff: f64 },

    #[error("discount must be between 0% and 100% (got {pct}%)")]
    DiscountOutOfRange { pct: f64 },

    #[error("due date {due} must be after the start of {reference}")]
    DueBeforeReference { due: NaiveDate, reference: ReferenceMonth },

    #[error("subscriber already has an open invoice for {reference}")]
    Duplicate { reference: ReferenceMonth },
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("invalid invoice: {}", join(.0))]
    Invalid(Vec<InvoiceIssue>),

    #[error("cannot move invoice from {from} to {to}")]
    InvalidTransition { from: InvoiceStatus, to: InvoiceStatus },

    #[error("subscriber {0} is inactive")]
    InactiveSubscriber(String),
}

fn join(issues: &[InvoiceIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
