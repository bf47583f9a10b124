use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::SubscriberId;

pub type InvoiceId = uuid::Uuid;

/// Billing month, e.g. `2024-03`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceMonth {
    pub year: i32,
    pub month: u32,
}

impl ReferenceMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        // Constructed through `new`, so the date always exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }
}

impl std::fmt::Display for ReferenceMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for ReferenceMonth {
    type Err = String;

    /// Accepts `YYYY-MM` or `MM/YYYY`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = if let Some((y, m)) = s.split_once('-') {
            y.parse::<i32>().ok().zip(m.parse::<u32>().ok())
        } else if let Some((m, y)) = s.split_once('/') {
            y.parse::<i32>().ok().zip(m.parse::<u32>().ok())
        } else {
            None
        };
        parsed
            .and_then(|(y, m)| ReferenceMonth::new(y, m))
            .ok_or_else(|| format!("invalid reference month: {} (use YYYY-MM)", s))
    }
}

impl TryFrom<String> for ReferenceMonth {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReferenceMonth> for String {
    fn from(month: ReferenceMonth) -> Self {
        month.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Issued,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Draft, InvoiceStatus::Issued)
                | (InvoiceStatus::Issued, InvoiceStatus::Paid)
                | (InvoiceStatus::Draft, InvoiceStatus::Cancelled)
                | (InvoiceStatus::Issued, InvoiceStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(InvoiceStatus::Draft),
            "issued" => Ok(InvoiceStatus::Issued),
            "paid" => Ok(InvoiceStatus::Paid),
            "cancelled" | "canceled" => Ok(InvoiceStatus::Cancelled),
            _ => Err(format!("unknown invoice status: {}", s)),
        }
    }
}

/// A subscriber's bill for the energy compensated in one month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub subscriber_id: SubscriberId,
    pub reference: ReferenceMonth,
    /// Energy consumed by the UC in the month, kWh.
    pub consumption_kwh: f64,
    /// Energy offset by shared generation, kWh.
    pub compensated_kwh: f64,
    /// Utility tariff in BRL per kWh.
    pub tariff: f64,
    pub discount_pct: f64,
    /// Amount due in centavos.
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub attachment: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Amount charged for compensated energy after the subscriber's discount.
pub fn invoice_amount_cents(compensated_kwh: f64, tariff: f64, discount_pct: f64) -> i64 {
    (compensated_kwh * tariff * (1.0 - discount_pct / 100.0) * 100.0).round() as i64
}

/// Render centavos as `R$ 1.234,56`.
pub fn format_brl(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let reais = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, c) in reais.chars().enumerate() {
        if i > 0 && (reais.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("{}R$ {},{:02}", sign, grouped, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_month_parse() {
        let m: ReferenceMonth = "2024-03".parse().unwrap();
        assert_eq!(m, ReferenceMonth { year: 2024, month: 3 });
        assert_eq!("03/2024".parse::<ReferenceMonth>().unwrap(), m);
        assert_eq!(m.to_string(), "2024-03");
        assert!("2024-13".parse::<ReferenceMonth>().is_err());
        assert!("march".parse::<ReferenceMonth>().is_err());
    }

    #[test]
    fn test_status_transitions() {
        assert!(InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Issued));
        assert!(InvoiceStatus::Issued.can_transition_to(InvoiceStatus::Paid));
        assert!(InvoiceStatus::Issued.can_transition_to(InvoiceStatus::Cancelled));
        assert!(!InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Paid));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Cancelled));
        assert!(!InvoiceStatus::Cancelled.can_transition_to(InvoiceStatus::Issued));
    }

    #[test]
    fn test_invoice_amount() {
        // 500 kWh at R$ 0,80 with 15% off = R$ 340,00
        assert_eq!(invoice_amount_cents(500.0, 0.80, 15.0), 34_000);
        assert_eq!(invoice_amount_cents(0.0, 0.80, 15.0), 0);
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(34_000), "R$ 340,00");
        assert_eq!(format_brl(123_456_789), "R$ 1.234.567,89");
        assert_eq!(format_brl(5), "R$ 0,05");
        assert_eq!(format_brl(-1_050), "-R$ 10,50");
    }
}
