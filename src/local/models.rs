//! Data models for local storage.
//!
//! Rows mirror the SQLite tables column for column. Each row converts into
//! its domain type with `TryFrom`, failing with [`DataError::Corrupt`] when
//! a stored value no longer parses.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{
    Address, Administrator, DataError, EnergyAccount, Generator, Invoice, Participant, Rateio,
    Representative, Subscriber,
};

fn corrupt(field: &'static str, err: impl Display) -> DataError {
    DataError::Corrupt(format!("{}: {}", field, err))
}

fn parse<T>(field: &'static str, value: &str) -> Result<T, DataError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|e| corrupt(field, e))
}

fn parse_opt<T>(field: &'static str, value: Option<&str>) -> Result<Option<T>, DataError>
where
    T: FromStr,
    T::Err: Display,
{
    value.map(|v| parse(field, v)).transpose()
}

fn parse_time(field: &'static str, value: &str) -> Result<DateTime<Utc>, DataError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(field, e))
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, DataError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| corrupt(field, e))
}

fn address_from_columns(
    cep: Option<&str>,
    street: &str,
    number: &str,
    complement: Option<&str>,
    neighborhood: &str,
    city: &str,
    state: &str,
) -> Result<Address, DataError> {
    Ok(Address {
        cep: parse_opt("cep", cep)?,
        street: street.to_string(),
        number: number.to_string(),
        complement: complement.map(str::to_string),
        neighborhood: neighborhood.to_string(),
        city: city.to_string(),
        state: state.to_string(),
    })
}

// ============================================================================
// Subscriber
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct SubscriberRow {
    pub id: String,
    pub name: String,
    pub document: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cep: Option<String>,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub uc: String,
    pub concessionaria: String,
    pub holder_name: String,
    pub holder_document: String,
    pub consumption_kwh: f64,
    pub accumulated_credit_kwh: f64,
    pub fidelidade: String,
    pub discount_pct: f64,
    pub representative_id: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = DataError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        Ok(Subscriber {
            id: parse::<Uuid>("subscriber.id", &row.id)?,
            address: address_from_columns(
                row.cep.as_deref(),
                &row.street,
                &row.number,
                row.complement.as_deref(),
                &row.neighborhood,
                &row.city,
                &row.state,
            )?,
            account: EnergyAccount {
                uc: parse("subscriber.uc", &row.uc)?,
                concessionaria: row.concessionaria,
                holder_name: row.holder_name,
                holder_document: parse("subscriber.holder_document", &row.holder_document)?,
            },
            name: row.name,
            document: parse("subscriber.document", &row.document)?,
            email: row.email,
            phone: parse_opt("subscriber.phone", row.phone.as_deref())?,
            consumption_kwh: row.consumption_kwh,
            accumulated_credit_kwh: row.accumulated_credit_kwh,
            fidelidade: parse("subscriber.fidelidade", &row.fidelidade)?,
            discount_pct: row.discount_pct,
            representative_id: parse_opt("subscriber.representative_id", row.representative_id.as_deref())?,
            status: parse("subscriber.status", &row.status)?,
            created_at: parse_time("subscriber.created_at", &row.created_at)?,
        })
    }
}

// ============================================================================
// Generator
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct GeneratorRow {
    pub id: String,
    pub nickname: String,
    pub owner_name: String,
    pub owner_document: String,
    pub uc: String,
    pub concessionaria: String,
    pub holder_name: String,
    pub holder_document: String,
    pub cep: Option<String>,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub admin_name: Option<String>,
    pub admin_document: Option<String>,
    pub admin_email: Option<String>,
    pub admin_phone: Option<String>,
    pub capacity_kwp: Option<f64>,
    pub expected_generation_kwh: f64,
    pub status: String,
    pub created_at: String,
}

impl TryFrom<GeneratorRow> for Generator {
    type Error = DataError;

    fn try_from(row: GeneratorRow) -> Result<Self, Self::Error> {
        let administrator = match (row.admin_name, row.admin_document) {
            (Some(name), Some(document)) => Some(Administrator {
                name,
                document: parse("generator.admin_document", &document)?,
                email: row.admin_email,
                phone: parse_opt("generator.admin_phone", row.admin_phone.as_deref())?,
            }),
            _ => None,
        };

        Ok(Generator {
            id: parse("generator.id", &row.id)?,
            address: address_from_columns(
                row.cep.as_deref(),
                &row.street,
                &row.number,
                row.complement.as_deref(),
                &row.neighborhood,
                &row.city,
                &row.state,
            )?,
            account: EnergyAccount {
                uc: parse("generator.uc", &row.uc)?,
                concessionaria: row.concessionaria,
                holder_name: row.holder_name,
                holder_document: parse("generator.holder_document", &row.holder_document)?,
            },
            nickname: row.nickname,
            owner_name: row.owner_name,
            owner_document: parse("generator.owner_document", &row.owner_document)?,
            administrator,
            capacity_kwp: row.capacity_kwp,
            expected_generation_kwh: row.expected_generation_kwh,
            status: parse("generator.status", &row.status)?,
            created_at: parse_time("generator.created_at", &row.created_at)?,
        })
    }
}

// ============================================================================
// Rateio
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct RateioRow {
    pub id: String,
    pub generator_id: String,
    pub kind: String,
    pub period: String,
    pub expected_generation_kwh: f64,
    pub unallocated_kwh: f64,
    pub notes: Option<String>,
    pub attachment: Option<String>,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ParticipantRow {
    pub subscriber_id: String,
    pub name: String,
    pub uc: String,
    pub consumption_kwh: f64,
    pub accumulated_credit_kwh: f64,
    pub percentage: Option<f64>,
    pub priority: Option<i64>,
    pub allocated_kwh: f64,
    pub credit_used_kwh: f64,
    pub remaining_credit_kwh: f64,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = DataError;

    fn try_from(row: ParticipantRow) -> Result<Self, Self::Error> {
        let priority = row
            .priority
            .map(|p| u32::try_from(p).map_err(|e| corrupt("participant.priority", e)))
            .transpose()?;
        Ok(Participant {
            subscriber_id: parse("participant.subscriber_id", &row.subscriber_id)?,
            name: row.name,
            uc: parse("participant.uc", &row.uc)?,
            consumption_kwh: row.consumption_kwh,
            accumulated_credit_kwh: row.accumulated_credit_kwh,
            percentage: row.percentage,
            priority,
            allocated_kwh: row.allocated_kwh,
            credit_used_kwh: row.credit_used_kwh,
            remaining_credit_kwh: row.remaining_credit_kwh,
        })
    }
}

impl RateioRow {
    /// Assemble a rateio from its row and its participants, in position order.
    pub fn into_rateio(self, participants: Vec<ParticipantRow>) -> Result<Rateio, DataError> {
        Ok(Rateio {
            id: parse("rateio.id", &self.id)?,
            generator_id: parse("rateio.generator_id", &self.generator_id)?,
            kind: parse("rateio.kind", &self.kind)?,
            period: parse_date("rateio.period", &self.period)?,
            expected_generation_kwh: self.expected_generation_kwh,
            unallocated_kwh: self.unallocated_kwh,
            participants: participants
                .into_iter()
                .map(Participant::try_from)
                .collect::<Result<_, _>>()?,
            notes: self.notes,
            attachment: self.attachment,
            status: parse("rateio.status", &self.status)?,
            created_at: parse_time("rateio.created_at", &self.created_at)?,
        })
    }
}

// ============================================================================
// Invoice
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub id: String,
    pub subscriber_id: String,
    pub reference: String,
    pub consumption_kwh: f64,
    pub compensated_kwh: f64,
    pub tariff: f64,
    pub discount_pct: f64,
    pub amount_cents: i64,
    pub due_date: String,
    pub status: String,
    pub attachment: Option<String>,
    pub issued_at: Option<String>,
    pub created_at: String,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DataError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice {
            id: parse("invoice.id", &row.id)?,
            subscriber_id: parse("invoice.subscriber_id", &row.subscriber_id)?,
            reference: parse("invoice.reference", &row.reference)?,
            consumption_kwh: row.consumption_kwh,
            compensated_kwh: row.compensated_kwh,
            tariff: row.tariff,
            discount_pct: row.discount_pct,
            amount_cents: row.amount_cents,
            due_date: parse_date("invoice.due_date", &row.due_date)?,
            status: parse("invoice.status", &row.status)?,
            attachment: row.attachment,
            issued_at: row
                .issued_at
                .as_deref()
                .map(|t| parse_time("invoice.issued_at", t))
                .transpose()?,
            created_at: parse_time("invoice.created_at", &row.created_at)?,
        })
    }
}

// ============================================================================
// Representative
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct RepresentativeRow {
    pub id: String,
    pub name: String,
    pub document: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub commission_pct: f64,
    pub created_at: String,
}

impl TryFrom<RepresentativeRow> for Representative {
    type Error = DataError;

    fn try_from(row: RepresentativeRow) -> Result<Self, Self::Error> {
        Ok(Representative {
            id: parse("representative.id", &row.id)?,
            name: row.name,
            document: parse("representative.document", &row.document)?,
            email: row.email,
            phone: parse_opt("representative.phone", row.phone.as_deref())?,
            commission_pct: row.commission_pct,
            created_at: parse_time("representative.created_at", &row.created_at)?,
        })
    }
}

/// Paid totals per representative for one month, before commission.
#[derive(Debug, Clone, FromRow)]
pub struct CommissionRow {
    pub representative_id: String,
    pub representative_name: String,
    pub commission_pct: f64,
    pub paid_invoices: i64,
    pub billed_cents: i64,
}
