//! Energy distribution.
//!
//! Splits a generator's expected output among participants and derives
//! each participant's allocation and credit usage. Energy is handed out in
//! whole kWh.

use serde::Serialize;

use crate::types::{AllocationKind, Participant};

/// Basis points in 100%.
const FULL_BPS: u64 = 10_000;

/// Result of a distribution run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub participants: Vec<Participant>,
    /// Generation nobody received. Reported only; it is not carried into
    /// the next period.
    pub unallocated_kwh: f64,
}

/// Compute allocations for every participant.
///
/// Percentage: participants without any percentage set get an equal split
/// (see [`equal_split`]). Priority: participants without any rank set are
/// ranked in list order. The input is left untouched.
pub fn calculate_auto_distribution(
    participants: &[Participant],
    kind: AllocationKind,
    expected_generation_kwh: f64,
) -> Distribution {
    let mut participants = participants.to_vec();
    let generation = expected_generation_kwh.max(0.0);

    let allocated = match kind {
        AllocationKind::Percentage => {
            if !participants.is_empty() && participants.iter().all(|p| p.percentage.is_none()) {
                let split = equal_split(participants.len());
                for (p, pct) in participants.iter_mut().zip(split) {
                    p.percentage = Some(pct);
                }
            }
            let exact: Vec<f64> = participants
                .iter()
                .map(|p| exact_share(p.percentage.unwrap_or(0.0), generation))
                .collect();
            apportion(&exact)
        }
        AllocationKind::Priority => {
            if participants.iter().all(|p| p.priority.is_none()) {
                for (rank, p) in participants.iter_mut().enumerate() {
                    p.priority = Some(rank as u32 + 1);
                }
            }
            fill_by_priority(&participants, generation)
        }
    };

    for (p, kwh) in participants.iter_mut().zip(allocated) {
        apply_allocation(p, kwh);
    }

    let total: f64 = participants.iter().map(|p| p.allocated_kwh).sum();
    Distribution {
        participants,
        unallocated_kwh: (generation - total).max(0.0),
    }
}

/// Split 100% evenly among `n` participants, in hundredths of a percent.
///
/// Leftover basis points go one each to the first participants so the
/// total is exactly 100.
pub fn equal_split(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let n = n as u64;
    let base = FULL_BPS / n;
    let remainder = FULL_BPS % n;
    (0..n)
        .map(|i| {
            let bps = base + u64::from(i < remainder);
            bps as f64 / 100.0
        })
        .collect()
}

/// Energy for a single percentage, rounded to the nearest kWh.
pub fn share_of(percentage: f64, expected_generation_kwh: f64) -> f64 {
    exact_share(percentage, expected_generation_kwh.max(0.0)).round()
}

/// Set derived fields from an allocation.
pub fn apply_allocation(p: &mut Participant, allocated_kwh: f64) {
    p.allocated_kwh = allocated_kwh;
    p.credit_used_kwh = p.accumulated_credit_kwh.min(allocated_kwh).max(0.0);
    p.remaining_credit_kwh = p.accumulated_credit_kwh - p.credit_used_kwh;
}

fn exact_share(percentage: f64, generation: f64) -> f64 {
    let value = percentage.max(0.0) * generation / 100.0;
    // Drop float noise so 60% of 1000 is 600, not 599.9999...
    (value * 1e6).round() / 1e6
}

/// Largest-remainder rounding: every value becomes its floor or ceiling
/// and the total equals the floor of the exact total.
fn apportion(exact: &[f64]) -> Vec<f64> {
    let mut floors: Vec<f64> = exact.iter().map(|v| v.floor()).collect();
    let total: f64 = exact.iter().sum();
    let target = ((total * 1e6).round() / 1e6).floor();
    let assigned: f64 = floors.iter().sum();
    let mut leftover = (target - assigned).max(0.0) as usize;

    let mut order: Vec<usize> = (0..exact.len()).collect();
    // Stable sort keeps list order among equal remainders.
    order.sort_by(|&a, &b| {
        let ra = exact[a] - floors[a];
        let rb = exact[b] - floors[b];
        rb.total_cmp(&ra)
    });

    for i in order {
        if leftover == 0 {
            break;
        }
        if exact[i] > floors[i] {
            floors[i] += 1.0;
            leftover -= 1;
        }
    }
    floors
}

/// Serve participants in ascending rank up to their consumption.
fn fill_by_priority(participants: &[Participant], generation: f64) -> Vec<f64> {
    let mut order: Vec<usize> = (0..participants.len()).collect();
    order.sort_by_key(|&i| participants[i].priority.unwrap_or(u32::MAX));

    let mut pool = generation.floor();
    let mut allocated = vec![0.0; participants.len()];
    for i in order {
        let want = participants[i].consumption_kwh.max(0.0).floor();
        let take = want.min(pool);
        allocated[i] = take;
        pool -= take;
    }
    allocated
}
