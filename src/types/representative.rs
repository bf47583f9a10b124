use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Document, Phone, ReferenceMonth};

pub type RepresentativeId = uuid::Uuid;

/// A sales representative who brings in subscribers and earns a
/// commission on what they pay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Representative {
    pub id: RepresentativeId,
    pub name: String,
    pub document: Document,
    pub email: Option<String>,
    pub phone: Option<Phone>,
    /// Share of paid invoice amounts, in percent.
    pub commission_pct: f64,
    pub created_at: DateTime<Utc>,
}

/// Commission owed to one representative for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionLine {
    pub representative_id: RepresentativeId,
    pub representative_name: String,
    pub reference: ReferenceMonth,
    pub paid_invoices: u32,
    pub billed_cents: i64,
    pub commission_cents: i64,
}

/// Commission on a billed amount, rounded to the centavo.
pub fn commission_cents(billed_cents: i64, commission_pct: f64) -> i64 {
    (billed_cents as f64 * commission_pct / 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_rounding() {
        assert_eq!(commission_cents(34_000, 5.0), 1_700);
        assert_eq!(commission_cents(999, 2.5), 25);
        assert_eq!(commission_cents(0, 10.0), 0);
    }
}
