//! Plan (problem instance) model.
//!
//! A plan is one complete 30-day cash-flow problem: balances, the target
//! band, known deposits and bills, manual adjustments, pre-set actions and
//! the lock ranges that pin them.
//!
//! # Day Representation
//! Days are 1-based (`1..=30`). Per-day arrays are indexed by `day - 1`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ShiftCode;

/// Number of days in the planning horizon.
pub const HORIZON: usize = 30;

/// A day of the horizon (`1..=30`).
pub type Day = u8;

/// Caller-supplied actions: `None` means "solver decides".
pub type SeedActions = [Option<ShiftCode>; HORIZON];

/// A fully assigned action sequence.
pub type Actions = [ShiftCode; HORIZON];

/// Array index for a day.
#[inline]
pub(crate) fn idx(day: Day) -> usize {
    usize::from(day) - 1
}

/// Slot for `day`, or `None` outside the horizon.
fn slot_mut(actions: &mut SeedActions, day: Day) -> Option<&mut Option<ShiftCode>> {
    usize::from(day).checked_sub(1).and_then(|i| actions.get_mut(i))
}

/// Iterates every day of the horizon.
pub fn all_days() -> impl Iterator<Item = Day> {
    1..=HORIZON as Day
}

/// An expected incoming payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub day: Day,
    pub amount: Decimal,
}

/// A known outgoing payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub day: Day,
    pub name: String,
    pub amount: Decimal,
}

/// A signed ad-hoc correction to a day's net flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub day: Day,
    pub amount: Decimal,
    pub note: Option<String>,
}

/// An inclusive day range whose actions must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Lock {
    pub start: Day,
    pub end: Day,
}

impl Lock {
    /// Creates a lock over `[start, end]`.
    pub fn new(start: Day, end: Day) -> Self {
        Self { start, end }
    }

    /// Whether `day` falls inside the lock.
    #[inline]
    pub fn contains(&self, day: Day) -> bool {
        self.start <= day && day <= self.end
    }

    /// Whether two locks share at least one day.
    pub fn overlaps(&self, other: &Lock) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// A 30-day cash-flow planning problem.
///
/// Constructed fresh per request, either through [`parse_plan`] (untyped
/// payloads) or the builder methods below, and checked by
/// [`validate_plan`] before any solver sees it.
///
/// [`parse_plan`]: crate::validation::parse_plan
/// [`validate_plan`]: crate::validation::validate_plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Balance at the beginning of day 1.
    pub start_balance: Decimal,
    /// Desired day-30 closing balance.
    pub target_end: Decimal,
    /// Symmetric tolerance around `target_end`.
    pub band: Decimal,
    /// Minimum balance kept around the guard day.
    pub rent_guard: Decimal,
    /// Explicit guard day. `None` = day of the largest bill.
    pub guard_day: Option<Day>,
    pub deposits: Vec<Deposit>,
    pub bills: Vec<Bill>,
    /// Seed/override actions, one slot per day.
    pub actions: SeedActions,
    pub manual_adjustments: Vec<Adjustment>,
    pub locks: Vec<Lock>,
    /// Opaque pass-through data.
    pub metadata: BTreeMap<String, String>,
}

impl Plan {
    /// Creates a plan with no flows, locks or seed actions.
    pub fn new(start_balance: Decimal, target_end: Decimal, band: Decimal) -> Self {
        Self {
            start_balance,
            target_end,
            band,
            rent_guard: Decimal::ZERO,
            guard_day: None,
            deposits: Vec::new(),
            bills: Vec::new(),
            actions: [None; HORIZON],
            manual_adjustments: Vec::new(),
            locks: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Sets the guard balance.
    pub fn with_rent_guard(mut self, rent_guard: Decimal) -> Self {
        self.rent_guard = rent_guard;
        self
    }

    /// Pins the guard to a specific day.
    pub fn with_guard_day(mut self, day: Day) -> Self {
        self.guard_day = Some(day);
        self
    }

    /// Adds a deposit.
    pub fn with_deposit(mut self, day: Day, amount: Decimal) -> Self {
        self.deposits.push(Deposit { day, amount });
        self
    }

    /// Adds a bill.
    pub fn with_bill(mut self, day: Day, name: impl Into<String>, amount: Decimal) -> Self {
        self.bills.push(Bill {
            day,
            name: name.into(),
            amount,
        });
        self
    }

    /// Adds a manual adjustment.
    pub fn with_adjustment(mut self, day: Day, amount: Decimal, note: Option<&str>) -> Self {
        self.manual_adjustments.push(Adjustment {
            day,
            amount,
            note: note.map(str::to_string),
        });
        self
    }

    /// Seeds the action for one day. Days outside `1..=30` are ignored.
    pub fn with_action(mut self, day: Day, code: ShiftCode) -> Self {
        if let Some(slot) = slot_mut(&mut self.actions, day) {
            *slot = Some(code);
        }
        self
    }

    /// Seeds the same action on every day in `[start, end]`. Days outside
    /// `1..=30` are ignored.
    pub fn with_actions(mut self, start: Day, end: Day, code: ShiftCode) -> Self {
        for day in start..=end {
            if let Some(slot) = slot_mut(&mut self.actions, day) {
                *slot = Some(code);
            }
        }
        self
    }

    /// Adds a lock range.
    pub fn with_lock(mut self, start: Day, end: Day) -> Self {
        self.locks.push(Lock::new(start, end));
        self
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Seed action for a day.
    #[inline]
    pub fn action(&self, day: Day) -> Option<ShiftCode> {
        let i = usize::from(day).checked_sub(1)?;
        self.actions.get(i).copied().flatten()
    }

    /// Whether any lock covers `day`.
    pub fn is_locked(&self, day: Day) -> bool {
        self.locks.iter().any(|l| l.contains(day))
    }

    /// Sum of deposits landing on `day`.
    pub fn deposit_total(&self, day: Day) -> Decimal {
        self.deposits.iter().filter(|d| d.day == day).map(|d| d.amount).sum()
    }

    /// Sum of bills due on `day`.
    pub fn bill_total(&self, day: Day) -> Decimal {
        self.bills.iter().filter(|b| b.day == day).map(|b| b.amount).sum()
    }

    /// Sum of manual adjustments on `day`.
    pub fn adjustment_total(&self, day: Day) -> Decimal {
        self.manual_adjustments
            .iter()
            .filter(|a| a.day == day)
            .map(|a| a.amount)
            .sum()
    }

    /// Inclusive acceptable range for the day-30 closing balance.
    pub fn band_range(&self) -> (Decimal, Decimal) {
        (self.target_end - self.band, self.target_end + self.band)
    }

    /// The day the guard protects.
    ///
    /// Uses `guard_day` when set; otherwise the day of the largest single
    /// bill, earliest day on ties. `None` when there is nothing to guard.
    pub fn resolved_guard_day(&self) -> Option<Day> {
        if self.guard_day.is_some() {
            return self.guard_day;
        }
        self.bills
            .iter()
            .max_by(|a, b| a.amount.cmp(&b.amount).then(b.day.cmp(&a.day)))
            .map(|b| b.day)
    }

    /// Sorts collections canonically.
    ///
    /// Deposits and adjustments by day, bills by day then name, locks by
    /// range. Sorting is stable, so same-key entries keep caller order.
    pub fn normalize(&mut self) {
        self.deposits.sort_by_key(|d| d.day);
        self.manual_adjustments.sort_by_key(|a| a.day);
        self.bills
            .sort_by(|a, b| a.day.cmp(&b.day).then_with(|| a.name.cmp(&b.name)));
        self.locks.sort();
    }
}
