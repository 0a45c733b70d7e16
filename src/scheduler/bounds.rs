//! Reachability bounds shared by the solvers.
//!
//! From any partial schedule (days up to `day` decided, closing balance
//! `balance`), every later closing balance lies between "rest on every free
//! day" and "work every free day at the highest rate". Comparing that
//! interval with the per-day floors and the target band answers two
//! questions in O(30):
//! - can this partial schedule still be completed at all?
//! - at least how many more work days will completing it take?
//!
//! Earnings are non-negative and `O` earns zero, so resting is always the
//! cheapest completion in balance terms.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::{ConstraintModel, Day, HORIZON};
use crate::projection::FlowTable;

/// Prefix sums over the decided horizon.
#[derive(Debug, Clone)]
pub struct HorizonBounds {
    /// `fixed_delta[d]`: balance change from `first_day` through `d` with
    /// every free day resting. Index 0 and days before `first_day` hold 0.
    fixed_delta: [Decimal; HORIZON + 1],
    /// Free (solver-decided) days from `first_day` through `d`.
    free: [u32; HORIZON + 1],
    /// Pinned work days from `first_day` through `d`.
    fixed_work: [u32; HORIZON + 1],
    max_rate: Decimal,
}

impl HorizonBounds {
    pub fn new(model: &ConstraintModel, flows: &FlowTable) -> Self {
        let mut fixed_delta = [Decimal::ZERO; HORIZON + 1];
        let mut free = [0u32; HORIZON + 1];
        let mut fixed_work = [0u32; HORIZON + 1];
        for day in model.days() {
            let d = usize::from(day);
            let (delta, is_free, is_work) = match model.fixed(day) {
                Some(code) => (flows.base(day) + flows.earning(code), 0, u32::from(code.is_work())),
                None => (flows.base(day), 1, 0),
            };
            fixed_delta[d] = fixed_delta[d - 1] + delta;
            free[d] = free[d - 1] + is_free;
            fixed_work[d] = fixed_work[d - 1] + is_work;
        }
        Self {
            fixed_delta,
            free,
            fixed_work,
            max_rate: flows.earnings().max_rate(),
        }
    }

    /// Lower bound on work days still to come after `day`, or `None` when
    /// no completion can satisfy the floors and the band.
    ///
    /// `day` is the last decided day (`first_day - 1` before any decision)
    /// and `balance` its closing.
    pub fn remaining_work(&self, model: &ConstraintModel, day: Day, balance: Decimal) -> Option<u32> {
        let from = usize::from(day);
        let mut needed = 0u32;

        for k in (day + 1)..=HORIZON as Day {
            let ku = usize::from(k);
            let resting = balance + self.fixed_delta[ku] - self.fixed_delta[from];
            let free = self.free[ku] - self.free[from];

            if let Some(floor) = model.floor(k) {
                needed = needed.max(self.days_to_cover(floor - resting, free)?);
            }
            if ku == HORIZON {
                let (lo, hi) = model.band();
                if resting > hi {
                    return None;
                }
                needed = needed.max(self.days_to_cover(lo - resting, free)?);
            }
        }

        if day as usize >= HORIZON && !model.in_band(balance) {
            return None;
        }
        Some(needed + self.fixed_work[HORIZON] - self.fixed_work[from])
    }

    /// Work days needed to close `deficit` using at most `free` days.
    fn days_to_cover(&self, deficit: Decimal, free: u32) -> Option<u32> {
        if deficit <= Decimal::ZERO {
            return Some(0);
        }
        if self.max_rate <= Decimal::ZERO {
            return None;
        }
        // Overflow means far more days than the horizon holds.
        let days = deficit.checked_div(self.max_rate)?.ceil().to_u32()?;
        (days <= free).then_some(days)
    }
}
