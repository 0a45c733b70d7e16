//! Ledger (solution trace) model.
//!
//! A ledger is the day-by-day balance trace of one action sequence. Rows
//! are produced only by [`projection`](crate::projection) and are never
//! edited afterwards; any change to the actions means a new projection.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Day, ShiftCode};

/// One simulated day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub day: Day,
    /// Previous day's closing (day 1: the start or anchor balance).
    pub opening: Decimal,
    /// Sum of deposits landing on this day.
    pub deposits: Decimal,
    pub action: ShiftCode,
    /// Net earning of `action`.
    pub earnings: Decimal,
    /// Sum of bills due on this day.
    pub bills: Decimal,
    /// Sum of manual adjustments on this day.
    pub adjustment: Decimal,
    pub closing: Decimal,
}

impl LedgerRow {
    /// Net change over the day.
    #[inline]
    pub fn net(&self) -> Decimal {
        self.closing - self.opening
    }

    /// Balance after the day's inflows but before its bills are paid.
    #[inline]
    pub fn pre_bill(&self) -> Decimal {
        self.closing + self.bills
    }
}

/// One named validator check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub label: String,
    pub passed: bool,
    /// Observed vs. required values.
    pub detail: String,
}

impl ValidationCheck {
    pub fn new(label: impl Into<String>, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            passed,
            detail: detail.into(),
        }
    }
}

/// Closing balance of the last row, if any.
pub fn final_balance(rows: &[LedgerRow]) -> Option<Decimal> {
    rows.last().map(|r| r.closing)
}
