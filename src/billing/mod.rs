//! Invoice rules: validation, amounts and status changes.

mod error;

pub use error::{BillingError, InvoiceIssue};

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::types::{
    Invoice, InvoiceStatus, Rateio, RateioStatus, ReferenceMonth, Subscriber, SubscriberId,
    invoice_amount_cents,
};

/// Values an operator enters for a new invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceInput {
    pub subscriber_id: SubscriberId,
    pub reference: ReferenceMonth,
    pub consumption_kwh: f64,
    pub compensated_kwh: f64,
    pub tariff: f64,
    pub discount_pct: f64,
    pub due_date: NaiveDate,
}

impl InvoiceInput {
    /// Start from a subscriber's contract: their consumption and discount.
    pub fn for_subscriber(
        subscriber: &Subscriber,
        reference: ReferenceMonth,
        tariff: f64,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            subscriber_id: subscriber.id,
            reference,
            consumption_kwh: subscriber.consumption_kwh,
            compensated_kwh: 0.0,
            tariff,
            discount_pct: subscriber.discount_pct,
            due_date,
        }
    }

    pub fn amount_cents(&self) -> i64 {
        invoice_amount_cents(self.compensated_kwh, self.tariff, self.discount_pct)
    }

    /// Build a draft invoice. Call [`validate_invoice`] first.
    pub fn into_invoice(self) -> Invoice {
        let amount_cents = self.amount_cents();
        Invoice {
            id: Uuid::now_v7(),
            subscriber_id: self.subscriber_id,
            reference: self.reference,
            consumption_kwh: self.consumption_kwh,
            compensated_kwh: self.compensated_kwh,
            tariff: self.tariff,
            discount_pct: self.discount_pct,
            amount_cents,
            due_date: self.due_date,
            status: InvoiceStatus::Draft,
            attachment: None,
            issued_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Check an invoice against the billing rules.
///
/// `open_for_month` is the number of non-cancelled invoices the subscriber
/// already has for the same reference month.
pub fn validate_invoice(input: &InvoiceInput, open_for_month: i64) -> Vec<InvoiceIssue> {
    let mut issues = Vec::new();

    if !(input.consumption_kwh > 0.0) {
        issues.push(InvoiceIssue::NonPositiveConsumption {
            kwh: input.consumption_kwh,
        });
    }
    if !(input.compensated_kwh >= 0.0 && input.compensated_kwh <= input.consumption_kwh.max(0.0)) {
        issues.push(InvoiceIssue::CompensatedOutOfRange {
            compensated: input.compensated_kwh,
            consumption: input.consumption_kwh,
        });
    }
    if !(input.tariff > 0.0 && input.tariff.is_finite()) {
        issues.push(InvoiceIssue::NonPositiveTariff { tariff: input.tariff });
    }
    if !(0.0..=100.0).contains(&input.discount_pct) {
        issues.push(InvoiceIssue::DiscountOutOfRange {
            pct: input.discount_pct,
        });
    }
    if input.due_date <= input.reference.first_day() {
        issues.push(InvoiceIssue::DueBeforeReference {
            due: input.due_date,
            reference: input.reference,
        });
    }
    if open_for_month > 0 {
        issues.push(InvoiceIssue::Duplicate {
            reference: input.reference,
        });
    }

    issues
}

/// Energy a subscriber received in a month across saved rateios: allocated
/// generation plus credit drawn down, capped at `consumption_kwh`.
pub fn compensated_from_rateios(
    rateios: &[Rateio],
    subscriber_id: SubscriberId,
    reference: ReferenceMonth,
    consumption_kwh: f64,
) -> f64 {
    let received: f64 = rateios
        .iter()
        .filter(|r| r.status != RateioStatus::Draft && ReferenceMonth::of(r.period) == reference)
        .flat_map(|r| r.participants.iter())
        .filter(|p| p.subscriber_id == subscriber_id)
        .map(|p| p.allocated_kwh + p.credit_used_kwh)
        .sum();
    received.min(consumption_kwh.max(0.0))
}

/// Check that `invoice` may move to `to`.
pub fn check_transition(invoice: &Invoice, to: InvoiceStatus) -> Result<(), BillingError> {
    if invoice.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(BillingError::InvalidTransition {
            from: invoice.status,
            to,
        })
    }
}
