//! Cash-flow planning domain models.
//!
//! Provides the core data types for one 30-day planning problem and its
//! solutions.
//!
//! # Domain Mappings
//!
//! | cashflow-schedule | Scheduling analogue |
//! |-------------------|---------------------|
//! | Plan | Problem instance |
//! | ShiftCode | Decision value per slot |
//! | Lock | Fixed assignment |
//! | LedgerRow | Simulated state per slot |
//! | ConstraintModel | Hard constraints |

mod constraint;
mod ledger;
mod plan;
mod shift;

pub use constraint::{ConstraintModel, GuardRule};
pub use ledger::{final_balance, LedgerRow, ValidationCheck};
pub use plan::{
    all_days, Actions, Adjustment, Bill, Day, Deposit, Lock, Plan, SeedActions, HORIZON,
};
pub(crate) use plan::idx;
pub use shift::{ShiftCode, UnknownShiftCode};
