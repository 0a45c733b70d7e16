//! Schedule quality metrics (KPIs).
//!
//! Computes the solver objective and reporting metrics from a completed
//! action sequence and its ledger.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Work days | Count of non-`O` actions (primary objective) |
//! | Back-to-back | Adjacent day pairs that are both work days (tie-break) |
//! | Total earnings | Sum of action earnings |
//! | Min closing | Lowest closing balance |
//! | Final balance | Day-30 closing balance |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{final_balance, LedgerRow, ShiftCode};

/// Two-level solver objective, compared lexicographically.
///
/// Fewer work days first; among equals, fewer back-to-back work pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Objective {
    pub work_days: u32,
    pub back_to_back: u32,
}

impl Objective {
    /// Objective of `actions`, where `worked_before` says whether the day
    /// preceding the first action was a work day.
    pub fn of(actions: &[ShiftCode], worked_before: bool) -> Self {
        let mut objective = Objective::default();
        let mut prev = worked_before;
        for code in actions {
            let worked = code.is_work();
            objective = objective.step(prev, worked);
            prev = worked;
        }
        objective
    }

    /// Objective after appending one day.
    #[inline]
    pub fn step(self, prev_worked: bool, worked: bool) -> Self {
        Self {
            work_days: self.work_days + u32::from(worked),
            back_to_back: self.back_to_back + u32::from(prev_worked && worked),
        }
    }
}

/// Schedule performance indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleKpi {
    pub work_days: u32,
    pub back_to_back: u32,
    pub total_earnings: Decimal,
    pub min_closing: Decimal,
    pub final_balance: Decimal,
}

impl ScheduleKpi {
    /// Computes KPIs from a full action sequence and its ledger.
    ///
    /// # Arguments
    /// * `actions` - All 30 actions (objective counts span the whole month).
    /// * `rows` - The ledger to summarize.
    pub fn calculate(actions: &[ShiftCode], rows: &[LedgerRow]) -> Self {
        let objective = Objective::of(actions, false);
        Self {
            work_days: objective.work_days,
            back_to_back: objective.back_to_back,
            total_earnings: rows.iter().map(|r| r.earnings).sum(),
            min_closing: rows.iter().map(|r| r.closing).min().unwrap_or(Decimal::ZERO),
            final_balance: final_balance(rows).unwrap_or(Decimal::ZERO),
        }
    }

    pub fn objective(&self) -> Objective {
        Objective {
            work_days: self.work_days,
            back_to_back: self.back_to_back,
        }
    }
}
