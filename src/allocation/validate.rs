//! Rateio validation.

use std::collections::{HashMap, HashSet};

use crate::types::{AllocationKind, Participant};

use super::error::{RateioIssue, RateioWarning, ValidationReport};

/// Allowed drift of the percentage sum around 100.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Slack for float comparisons on kWh values.
const KWH_EPSILON: f64 = 1e-6;

/// Validate participants with the default percentage tolerance.
pub fn validate_rateio(participants: &[Participant], kind: AllocationKind) -> ValidationReport {
    validate_rateio_with(participants, kind, DEFAULT_TOLERANCE)
}

/// Validate participants of a rateio of the given kind.
///
/// Errors block saving. Warnings are computed from the derived
/// `allocated_kwh`, so run a distribution first to get meaningful ones.
pub fn validate_rateio_with(
    participants: &[Participant],
    kind: AllocationKind,
    tolerance: f64,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    if participants.is_empty() {
        report.errors.push(RateioIssue::NoParticipants);
        return report;
    }

    check_duplicate_subscribers(participants, &mut report);

    match kind {
        AllocationKind::Percentage => check_percentages(participants, tolerance, &mut report),
        AllocationKind::Priority => check_priorities(participants, &mut report),
    }

    for p in participants {
        let limit = p.consumption_kwh + p.accumulated_credit_kwh;
        if p.allocated_kwh > limit + KWH_EPSILON {
            report.warnings.push(RateioWarning::OverAllocation {
                name: p.name.clone(),
                allocated: p.allocated_kwh,
                limit,
            });
        }
    }

    report
}

fn check_duplicate_subscribers(participants: &[Participant], report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for p in participants {
        if !seen.insert(p.subscriber_id) {
            report.errors.push(RateioIssue::DuplicateSubscriber {
                name: p.name.clone(),
            });
        }
    }
}

fn check_percentages(participants: &[Participant], tolerance: f64, report: &mut ValidationReport) {
    let mut total = 0.0;
    for p in participants {
        let value = p.percentage.unwrap_or(0.0);
        if !(0.0..=100.0).contains(&value) {
            report.errors.push(RateioIssue::PercentageOutOfRange {
                name: p.name.clone(),
                value,
            });
        }
        if value == 0.0 {
            report.warnings.push(RateioWarning::ZeroShare {
                name: p.name.clone(),
            });
        }
        total += value;
    }

    if (total - 100.0).abs() > tolerance || total.is_nan() {
        report.errors.push(RateioIssue::PercentageSum { total });
    }
}

fn check_priorities(participants: &[Participant], report: &mut ValidationReport) {
    let expected = participants.len();
    let mut counts: HashMap<u32, usize> = HashMap::new();

    for p in participants {
        match p.priority {
            None => report.errors.push(RateioIssue::MissingPriority {
                name: p.name.clone(),
            }),
            Some(rank) => *counts.entry(rank).or_default() += 1,
        }
    }

    let mut ranks: Vec<_> = counts.into_iter().collect();
    ranks.sort_unstable();

    for (rank, count) in ranks {
        if count > 1 {
            report.errors.push(RateioIssue::DuplicatePriority { rank });
        }
        if rank == 0 || rank as usize > expected {
            report
                .errors
                .push(RateioIssue::PriorityOutOfSequence { rank, expected });
        }
    }

    for p in participants {
        if p.priority.is_some() && p.allocated_kwh <= KWH_EPSILON {
            report.warnings.push(RateioWarning::NothingAllocated {
                name: p.name.clone(),
            });
        }
    }
}
