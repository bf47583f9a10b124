//! In-memory rateio being edited by an operator.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::{
    AllocationKind, EntityStatus, Generator, GeneratorId, Participant, Rateio, RateioStatus,
    Subscriber,
};

use super::distribute::{apply_allocation, calculate_auto_distribution, share_of};
use super::error::{AllocationError, RateioIssue, RateioWarning, ValidationReport};
use super::validate::{DEFAULT_TOLERANCE, validate_rateio_with};

/// Which share value an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareField {
    Percentage,
    Priority,
}

impl std::str::FromStr for ShareField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "percentage" | "pct" | "%" => Ok(ShareField::Percentage),
            "priority" | "rank" => Ok(ShareField::Priority),
            _ => Err(format!("unknown share field: {}", s)),
        }
    }
}

/// A rateio under construction.
///
/// Derived participant fields are recomputed whenever the generation,
/// participant set or allocation kind changes. Until the operator sets a
/// share explicitly, recomputing also re-applies the defaults (equal split
/// or list-order ranks) so adding a participant keeps the split even.
#[derive(Debug, Clone, Serialize)]
pub struct RateioDraft {
    pub generator_id: GeneratorId,
    pub generator_name: String,
    pub kind: AllocationKind,
    pub period: NaiveDate,
    pub expected_generation_kwh: f64,
    pub participants: Vec<Participant>,
    pub unallocated_kwh: f64,
    pub notes: Option<String>,
    pub attachment: Option<String>,
    #[serde(skip)]
    tolerance: f64,
    #[serde(skip)]
    explicit_shares: bool,
}

impl RateioDraft {
    /// Start a draft for an active generator, using its projected output.
    pub fn new(
        generator: &Generator,
        kind: AllocationKind,
        period: NaiveDate,
    ) -> Result<Self, AllocationError> {
        if !generator.is_active() {
            return Err(AllocationError::InactiveGenerator(generator.nickname.clone()));
        }
        Ok(Self {
            generator_id: generator.id,
            generator_name: generator.nickname.clone(),
            kind,
            period,
            expected_generation_kwh: generator.expected_generation_kwh,
            participants: Vec::new(),
            unallocated_kwh: generator.expected_generation_kwh.max(0.0),
            notes: None,
            attachment: None,
            tolerance: DEFAULT_TOLERANCE,
            explicit_shares: false,
        })
    }

    /// Build the target period from day/month/year parts.
    pub fn period_from_parts(day: u32, month: u32, year: i32) -> Result<NaiveDate, AllocationError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| AllocationError::InvalidPeriod(format!("{:02}/{:02}/{}", day, month, year)))
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn add_participant(&mut self, subscriber: &Subscriber) -> Result<usize, AllocationError> {
        if subscriber.status == EntityStatus::Inactive {
            return Err(AllocationError::InactiveSubscriber(subscriber.name.clone()));
        }
        if self
            .participants
            .iter()
            .any(|p| p.subscriber_id == subscriber.id)
        {
            return Err(AllocationError::DuplicateSubscriber(subscriber.name.clone()));
        }

        self.participants.push(Participant::new(
            subscriber.id,
            subscriber.name.clone(),
            subscriber.account.uc.clone(),
            subscriber.consumption_kwh,
            subscriber.accumulated_credit_kwh,
        ));
        self.recompute();
        Ok(self.participants.len() - 1)
    }

    pub fn remove_participant(&mut self, index: usize) -> Result<Participant, AllocationError> {
        self.check_index(index)?;
        let removed = self.participants.remove(index);
        self.recompute();
        Ok(removed)
    }

    pub fn set_kind(&mut self, kind: AllocationKind) {
        self.kind = kind;
        self.recompute();
    }

    pub fn set_expected_generation(&mut self, kwh: f64) {
        self.expected_generation_kwh = kwh;
        self.recompute();
    }

    /// Change one participant's percentage or priority.
    ///
    /// A percentage edit on a percentage rateio updates only that
    /// participant's derived fields; other shares are not rebalanced and
    /// the 100% rule is left to [`RateioDraft::validate`]. A rank edit on a
    /// priority rateio refills every participant, since ranks decide who
    /// is served first.
    pub fn update_subscriber_value(
        &mut self,
        index: usize,
        field: ShareField,
        value: f64,
    ) -> Result<(), AllocationError> {
        self.check_index(index)?;
        if !value.is_finite() {
            return Err(AllocationError::InvalidValue {
                field: field_name(field),
                value,
            });
        }
        self.explicit_shares = true;

        let generation = self.expected_generation_kwh;
        let kind = self.kind;
        let p = &mut self.participants[index];
        match field {
            ShareField::Percentage => {
                p.percentage = Some(value);
                if kind == AllocationKind::Percentage {
                    apply_allocation(p, share_of(value, generation));
                }
            }
            ShareField::Priority => {
                if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
                    return Err(AllocationError::InvalidValue {
                        field: field_name(field),
                        value,
                    });
                }
                p.priority = Some(value as u32);
            }
        }
        if field == ShareField::Priority && kind == AllocationKind::Priority {
            self.auto_distribute();
        } else {
            self.refresh_unallocated();
        }
        Ok(())
    }

    /// Recompute all allocations from the current shares.
    pub fn auto_distribute(&mut self) {
        let distribution =
            calculate_auto_distribution(&self.participants, self.kind, self.expected_generation_kwh);
        self.participants = distribution.participants;
        self.unallocated_kwh = distribution.unallocated_kwh;
    }

    pub fn validate(&self) -> ValidationReport {
        let mut report = validate_rateio_with(&self.participants, self.kind, self.tolerance);
        if self.expected_generation_kwh <= 0.0 || self.expected_generation_kwh.is_nan() {
            report.errors.insert(
                0,
                RateioIssue::NoGeneration {
                    kwh: self.expected_generation_kwh,
                },
            );
        }
        if self.kind == AllocationKind::Priority && self.unallocated_kwh > 0.0 {
            report.warnings.push(RateioWarning::Unallocated {
                kwh: self.unallocated_kwh,
            });
        }
        report
    }

    /// Turn the draft into a pending rateio. The draft is left as is when
    /// validation fails so the operator can fix it and retry.
    ///
    /// Allocations are recomputed from the shares before saving, so single
    /// participant edits never leave Σ allocated above the generation.
    pub fn finalize(&self) -> Result<Rateio, AllocationError> {
        let distribution =
            calculate_auto_distribution(&self.participants, self.kind, self.expected_generation_kwh);
        let canonical = Self {
            participants: distribution.participants,
            unallocated_kwh: distribution.unallocated_kwh,
            ..self.clone()
        };

        let report = canonical.validate();
        if !report.is_valid() {
            return Err(AllocationError::Invalid(report));
        }
        Ok(Rateio {
            id: Uuid::now_v7(),
            generator_id: canonical.generator_id,
            kind: canonical.kind,
            period: canonical.period,
            expected_generation_kwh: canonical.expected_generation_kwh,
            unallocated_kwh: canonical.unallocated_kwh,
            participants: canonical.participants,
            notes: canonical.notes,
            attachment: canonical.attachment,
            status: RateioStatus::Pending,
            created_at: Utc::now(),
        })
    }

    fn recompute(&mut self) {
        if !self.explicit_shares {
            for p in &mut self.participants {
                p.percentage = None;
                p.priority = None;
            }
        }
        self.auto_distribute();
    }

    fn refresh_unallocated(&mut self) {
        let total: f64 = self.participants.iter().map(|p| p.allocated_kwh).sum();
        self.unallocated_kwh = (self.expected_generation_kwh - total).max(0.0);
    }

    fn check_index(&self, index: usize) -> Result<(), AllocationError> {
        if index >= self.participants.len() {
            return Err(AllocationError::IndexOutOfRange {
                index,
                len: self.participants.len(),
            });
        }
        Ok(())
    }
}

fn field_name(field: ShareField) -> &'static str {
    match field {
        ShareField::Percentage => "percentage",
        ShareField::Priority => "priority",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, EnergyAccount, Fidelidade};

    fn generator(expected: f64) -> Generator {
        Generator {
            id: Uuid::new_v4(),
            nickname: "Usina Sol Nascente".to_string(),
            owner_name: "Sol Nascente Energia Ltda".to_string(),
            owner_document: "11.222.333/0001-81".parse().unwrap(),
            account: EnergyAccount {
                uc: "300012345".parse().unwrap(),
                concessionaria: "CEMIG".to_string(),
                holder_name: "Sol Nascente Energia Ltda".to_string(),
                holder_document: "11.222.333/0001-81".parse().unwrap(),
            },
            address: Address::default(),
            administrator: None,
            capacity_kwp: Some(75.0),
            expected_generation_kwh: expected,
            status: EntityStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn subscriber(name: &str, consumption: f64, credit: f64) -> Subscriber {
        Subscriber {
            id: Uuid::new_v4(),
            name: name.to_string(),
            document: "529.982.247-25".parse().unwrap(),
            email: None,
            phone: None,
            address: Address::default(),
            account: EnergyAccount {
                uc: "700000001".parse().unwrap(),
                concessionaria: "CEMIG".to_string(),
                holder_name: name.to_string(),
                holder_document: "529.982.247-25".parse().unwrap(),
            },
            consumption_kwh: consumption,
            accumulated_credit_kwh: credit,
            fidelidade: Fidelidade::None,
            discount_pct: 10.0,
            representative_id: None,
            status: EntityStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn period() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_inactive_generator_rejected() {
        let mut g = generator(1000.0);
        g.status = EntityStatus::Inactive;
        let err = RateioDraft::new(&g, AllocationKind::Percentage, period()).unwrap_err();
        assert!(matches!(err, AllocationError::InactiveGenerator(_)));
    }

    #[test]
    fn test_adding_keeps_equal_split() {
        let mut draft = RateioDraft::new(&generator(1000.0), AllocationKind::Percentage, period()).unwrap();
        draft.add_participant(&subscriber("a", 500.0, 0.0)).unwrap();
        assert_eq!(draft.participants[0].allocated_kwh, 1000.0);

        draft.add_participant(&subscriber("b", 500.0, 0.0)).unwrap();
        let pcts: Vec<_> = draft.participants.iter().map(|p| p.percentage).collect();
        assert_eq!(pcts, vec![Some(50.0), Some(50.0)]);
        assert!(draft.validate().is_valid());
    }

    #[test]
    fn test_duplicate_and_inactive_subscriber() {
        let mut draft = RateioDraft::new(&generator(1000.0), AllocationKind::Percentage, period()).unwrap();
        let a = subscriber("a", 500.0, 0.0);
        draft.add_participant(&a).unwrap();
        assert!(matches!(
            draft.add_participant(&a),
            Err(AllocationError::DuplicateSubscriber(_))
        ));

        let mut b = subscriber("b", 500.0, 0.0);
        b.status = EntityStatus::Inactive;
        assert!(matches!(
            draft.add_participant(&b),
            Err(AllocationError::InactiveSubscriber(_))
        ));
    }

    #[test]
    fn test_update_value_touches_only_one_participant() {
        let mut draft = RateioDraft::new(&generator(1000.0), AllocationKind::Percentage, period()).unwrap();
        draft.add_participant(&subscriber("a", 800.0, 0.0)).unwrap();
        draft.add_participant(&subscriber("b", 800.0, 0.0)).unwrap();

        draft
            .update_subscriber_value(0, ShareField::Percentage, 60.0)
            .unwrap();
        assert_eq!(draft.participants[0].allocated_kwh, 600.0);
        // b keeps its 50% and is not rebalanced
        assert_eq!(draft.participants[1].percentage, Some(50.0));
        assert_eq!(draft.participants[1].allocated_kwh, 500.0);

        let report = draft.validate();
        assert!(!report.is_valid());
        assert!(matches!(report.errors[0], RateioIssue::PercentageSum { .. }));

        draft
            .update_subscriber_value(1, ShareField::Percentage, 40.0)
            .unwrap();
        assert_eq!(draft.participants[1].allocated_kwh, 400.0);
        assert!(draft.validate().is_valid());
    }

    #[test]
    fn test_update_value_errors() {
        let mut draft = RateioDraft::new(&generator(1000.0), AllocationKind::Priority, period()).unwrap();
        draft.add_participant(&subscriber("a", 800.0, 0.0)).unwrap();
        assert!(matches!(
            draft.update_subscriber_value(3, ShareField::Priority, 1.0),
            Err(AllocationError::IndexOutOfRange { index: 3, len: 1 })
        ));
        assert!(matches!(
            draft.update_subscriber_value(0, ShareField::Priority, 1.5),
            Err(AllocationError::InvalidValue { .. })
        ));
        assert!(matches!(
            draft.update_subscriber_value(0, ShareField::Percentage, f64::NAN),
            Err(AllocationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_switching_kind_recomputes() {
        let mut draft = RateioDraft::new(&generator(700.0), AllocationKind::Percentage, period()).unwrap();
        draft.add_participant(&subscriber("a", 300.0, 0.0)).unwrap();
        draft.add_participant(&subscriber("b", 500.0, 0.0)).unwrap();
        draft.add_participant(&subscriber("c", 400.0, 0.0)).unwrap();

        draft.set_kind(AllocationKind::Priority);
        let allocated: Vec<_> = draft.participants.iter().map(|p| p.allocated_kwh).collect();
        assert_eq!(allocated, vec![300.0, 400.0, 0.0]);

        let report = draft.validate();
        assert!(report.is_valid());
        assert!(report.warnings.contains(&RateioWarning::NothingAllocated {
            name: "c".to_string()
        }));
    }

    #[test]
    fn test_generation_change_recomputes() {
        let mut draft = RateioDraft::new(&generator(1000.0), AllocationKind::Percentage, period()).unwrap();
        draft.add_participant(&subscriber("a", 800.0, 50.0)).unwrap();
        draft.set_expected_generation(200.0);
        let p = &draft.participants[0];
        assert_eq!(p.allocated_kwh, 200.0);
        assert_eq!(p.credit_used_kwh, 50.0);
        assert_eq!(p.remaining_credit_kwh, 0.0);
    }

    #[test]
    fn test_priority_leftover_warns() {
        let mut draft = RateioDraft::new(&generator(1000.0), AllocationKind::Priority, period()).unwrap();
        draft.add_participant(&subscriber("a", 300.0, 0.0)).unwrap();
        assert_eq!(draft.unallocated_kwh, 700.0);
        let report = draft.validate();
        assert!(report.is_valid());
        assert!(report.warnings.contains(&RateioWarning::Unallocated { kwh: 700.0 }));
    }

    #[test]
    fn test_finalize_blocks_invalid_and_keeps_draft() {
        let mut draft = RateioDraft::new(&generator(1000.0), AllocationKind::Percentage, period()).unwrap();
        draft.add_participant(&subscriber("a", 800.0, 0.0)).unwrap();
        draft.add_participant(&subscriber("b", 800.0, 0.0)).unwrap();
        draft
            .update_subscriber_value(0, ShareField::Percentage, 60.0)
            .unwrap();
        draft
            .update_subscriber_value(1, ShareField::Percentage, 30.0)
            .unwrap();

        let err = draft.finalize().unwrap_err();
        assert!(err.to_string().contains("100%"));
        assert_eq!(draft.participants.len(), 2);

        draft
            .update_subscriber_value(1, ShareField::Percentage, 40.0)
            .unwrap();
        let rateio = draft.finalize().unwrap();
        assert_eq!(rateio.status, RateioStatus::Pending);
        assert_eq!(rateio.total_allocated_kwh(), 1000.0);
    }

    #[test]
    fn test_rank_edits_refill_by_priority() {
        let mut draft = RateioDraft::new(&generator(600.0), AllocationKind::Priority, period()).unwrap();
        draft.add_participant(&subscriber("a", 300.0, 0.0)).unwrap();
        draft.add_participant(&subscriber("b", 500.0, 0.0)).unwrap();

        draft.update_subscriber_value(0, ShareField::Priority, 2.0).unwrap();
        draft.update_subscriber_value(1, ShareField::Priority, 1.0).unwrap();
        let allocated: Vec<_> = draft.participants.iter().map(|p| p.allocated_kwh).collect();
        assert_eq!(allocated, vec![100.0, 500.0]);

        let rateio = draft.finalize().unwrap();
        let saved: Vec<_> = rateio
            .participants
            .iter()
            .map(|p| (p.priority, p.allocated_kwh))
            .collect();
        assert_eq!(saved, vec![(Some(2), 100.0), (Some(1), 500.0)]);
        assert_eq!(rateio.unallocated_kwh, 0.0);
    }

    #[test]
    fn test_finalize_keeps_total_within_generation() {
        let mut draft = RateioDraft::new(&generator(1001.0), AllocationKind::Percentage, period()).unwrap();
        draft.add_participant(&subscriber("a", 800.0, 0.0)).unwrap();
        draft.add_participant(&subscriber("b", 800.0, 0.0)).unwrap();
        draft.update_subscriber_value(0, ShareField::Percentage, 50.0).unwrap();
        draft.update_subscriber_value(1, ShareField::Percentage, 50.0).unwrap();

        let rateio = draft.finalize().unwrap();
        assert_eq!(rateio.total_allocated_kwh(), 1001.0);
        let allocated: Vec<_> = rateio.participants.iter().map(|p| p.allocated_kwh).collect();
        assert_eq!(allocated, vec![501.0, 500.0]);
    }

    #[test]
    fn test_finalize_matches_fresh_distribution() {
        let mut draft = RateioDraft::new(&generator(557.0), AllocationKind::Percentage, period()).unwrap();
        draft.add_participant(&subscriber("a", 800.0, 20.0)).unwrap();
        draft.add_participant(&subscriber("b", 800.0, 0.0)).unwrap();
        draft.add_participant(&subscriber("c", 800.0, 0.0)).unwrap();
        for (i, pct) in [33.33, 33.33, 33.34].into_iter().enumerate() {
            draft.update_subscriber_value(i, ShareField::Percentage, pct).unwrap();
        }

        let rateio = draft.finalize().unwrap();
        let again = calculate_auto_distribution(&rateio.participants, rateio.kind, 557.0);
        assert_eq!(again.participants, rateio.participants);
        assert!(rateio.total_allocated_kwh() <= 557.0);
    }

    #[test]
    fn test_zero_generation_is_invalid() {
        let mut draft = RateioDraft::new(&generator(0.0), AllocationKind::Percentage, period()).unwrap();
        draft.add_participant(&subscriber("a", 800.0, 0.0)).unwrap();
        let report = draft.validate();
        assert_eq!(report.errors, vec![RateioIssue::NoGeneration { kwh: 0.0 }]);
    }

    #[test]
    fn test_period_from_parts() {
        assert_eq!(RateioDraft::period_from_parts(15, 3, 2024).unwrap(), period());
        assert!(RateioDraft::period_from_parts(30, 2, 2024).is_err());
    }
}
