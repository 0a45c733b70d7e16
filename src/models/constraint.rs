//! Constraint model.
//!
//! The single feasibility predicate shared by both solvers and the
//! validator. A schedule is acceptable when:
//! - the day-30 closing balance lies in `[target_end - band, target_end + band]`
//! - no closing balance falls below the configured floor (zero by default)
//! - the guard balance holds on the day before the guard day and on the
//!   guard day itself before its bills are paid
//! - every locked (or frozen) day keeps its pre-set action
//!
//! The balance conditions are compiled into a per-day closing floor so the
//! solvers can prune with the same numbers the validator reports against.
//!
//! # Horizons
//! A model normally covers days `1..=30` opening at the plan's start
//! balance. An *anchored* model (re-planning) covers `through_day+1..=30`,
//! opens at an observed balance, and treats days `1..=through_day` as
//! frozen; conditions on frozen days are history and are not re-checked.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::plan::idx;
use super::{Day, LedgerRow, Plan, SeedActions, ShiftCode, ValidationCheck, HORIZON};

/// Guard requirement around one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardRule {
    /// Day carrying the guarded bill.
    pub day: Day,
    /// Minimum balance required.
    pub amount: Decimal,
    /// Bills due on the guard day.
    pub bill_total: Decimal,
}

/// Compiled constraints for one solve.
#[derive(Debug, Clone)]
pub struct ConstraintModel {
    first_day: Day,
    opening: Decimal,
    band_lo: Decimal,
    band_hi: Decimal,
    min_balance: Option<Decimal>,
    guard: Option<GuardRule>,
    floors: [Option<Decimal>; HORIZON],
    opening_floor: Option<Decimal>,
    fixed: SeedActions,
}

impl ConstraintModel {
    /// Builds the model for the full horizon.
    pub fn new(plan: &Plan, min_balance: Option<Decimal>) -> Self {
        let mut fixed = [None; HORIZON];
        for lock in &plan.locks {
            for day in lock.start..=lock.end {
                fixed[idx(day)] = plan.action(day);
            }
        }
        Self::build(plan, min_balance, 1, plan.start_balance, fixed)
    }

    /// Builds the model for days after `through_day`, opening at `observed`.
    ///
    /// Days `1..=through_day` are frozen to the plan's recorded actions.
    pub fn anchored(
        plan: &Plan,
        min_balance: Option<Decimal>,
        through_day: Day,
        observed: Decimal,
    ) -> Self {
        let mut model = Self::new(plan, min_balance);
        for day in 1..=through_day {
            model.fixed[idx(day)] = plan.action(day);
        }
        Self::build(plan, min_balance, through_day + 1, observed, model.fixed)
    }

    fn build(
        plan: &Plan,
        min_balance: Option<Decimal>,
        first_day: Day,
        opening: Decimal,
        fixed: SeedActions,
    ) -> Self {
        let (band_lo, band_hi) = plan.band_range();
        let guard = plan.resolved_guard_day().map(|day| GuardRule {
            day,
            amount: plan.rent_guard,
            bill_total: plan.bill_total(day),
        });

        let mut floors = [None; HORIZON];
        for day in first_day..=HORIZON as Day {
            floors[idx(day)] = min_balance;
        }
        let mut opening_floor = None;

        if let Some(g) = &guard {
            if g.day >= first_day {
                raise(&mut floors[idx(g.day)], g.amount - g.bill_total);
                if g.day > first_day {
                    raise(&mut floors[idx(g.day - 1)], g.amount);
                } else {
                    opening_floor = Some(g.amount);
                }
            }
        }

        Self {
            first_day,
            opening,
            band_lo,
            band_hi,
            min_balance,
            guard,
            floors,
            opening_floor,
            fixed,
        }
    }

    /// First day the solvers decide (`31` when nothing is left).
    #[inline]
    pub fn first_day(&self) -> Day {
        self.first_day
    }

    /// Balance at the start of `first_day`.
    #[inline]
    pub fn opening(&self) -> Decimal {
        self.opening
    }

    /// Days the solvers walk through, in order.
    pub fn days(&self) -> std::ops::RangeInclusive<Day> {
        self.first_day..=HORIZON as Day
    }

    /// Acceptable day-30 range.
    #[inline]
    pub fn band(&self) -> (Decimal, Decimal) {
        (self.band_lo, self.band_hi)
    }

    #[inline]
    pub fn in_band(&self, balance: Decimal) -> bool {
        self.band_lo <= balance && balance <= self.band_hi
    }

    /// Lowest allowed closing balance for `day`, if any.
    #[inline]
    pub fn floor(&self, day: Day) -> Option<Decimal> {
        self.floors[idx(day)]
    }

    /// Whether `closing` respects the floor of `day`.
    #[inline]
    pub fn closing_ok(&self, day: Day, closing: Decimal) -> bool {
        self.floor(day).map_or(true, |f| closing >= f)
    }

    /// Whether the opening balance itself meets the guard, when the guard
    /// day is the first decided day.
    pub fn opening_ok(&self) -> bool {
        self.opening_floor.map_or(true, |f| self.opening >= f)
    }

    /// Action a solver must keep on `day`, if pinned.
    #[inline]
    pub fn fixed(&self, day: Day) -> Option<ShiftCode> {
        self.fixed[idx(day)]
    }

    /// Whether the day before `first_day` was a work day.
    pub fn worked_before_start(&self) -> bool {
        self.first_day > 1 && self.fixed(self.first_day - 1).is_some_and(ShiftCode::is_work)
    }

    pub fn guard(&self) -> Option<&GuardRule> {
        self.guard.as_ref()
    }

    /// Runs every check against a ledger.
    ///
    /// `rows` may cover the whole horizon; rows before `first_day` are
    /// only consulted for lock fidelity. Order is stable: band, floor,
    /// guard, locks.
    pub fn checks(&self, rows: &[LedgerRow]) -> Vec<ValidationCheck> {
        vec![
            self.band_check(rows),
            self.floor_check(rows),
            self.guard_check(rows),
            self.lock_check(rows),
        ]
    }

    /// The feasibility predicate: overall verdict plus violation reasons.
    pub fn is_feasible(&self, rows: &[LedgerRow]) -> (bool, Vec<String>) {
        let reasons: Vec<String> = self
            .checks(rows)
            .into_iter()
            .filter(|c| !c.passed)
            .map(|c| format!("{}: {}", c.label, c.detail))
            .collect();
        (reasons.is_empty(), reasons)
    }

    fn horizon_rows<'a>(&self, rows: &'a [LedgerRow]) -> impl Iterator<Item = &'a LedgerRow> {
        let first = self.first_day;
        rows.iter().filter(move |r| r.day >= first)
    }

    fn closing_on(&self, rows: &[LedgerRow], day: Day) -> Option<Decimal> {
        self.horizon_rows(rows).find(|r| r.day == day).map(|r| r.closing)
    }

    /// Day-30 closing (the opening when no day is left to decide).
    pub fn final_balance(&self, rows: &[LedgerRow]) -> Decimal {
        self.horizon_rows(rows)
            .last()
            .map_or(self.opening, |r| r.closing)
    }

    pub fn band_check(&self, rows: &[LedgerRow]) -> ValidationCheck {
        let closing = self.final_balance(rows);
        let passed = self.in_band(closing);
        ValidationCheck::new(
            "band satisfied",
            passed,
            format!(
                "day-30 closing {closing} {} [{}, {}]",
                if passed { "within" } else { "outside" },
                self.band_lo,
                self.band_hi
            ),
        )
    }

    pub fn floor_check(&self, rows: &[LedgerRow]) -> ValidationCheck {
        let Some(min) = self.min_balance else {
            return ValidationCheck::new("no negative balance", true, "balance floor disabled");
        };
        let low: Vec<&LedgerRow> = self.horizon_rows(rows).filter(|r| r.closing < min).collect();
        match low.iter().min_by(|a, b| a.closing.cmp(&b.closing)) {
            None => {
                let lowest = self
                    .horizon_rows(rows)
                    .map(|r| r.closing)
                    .min()
                    .unwrap_or(self.opening);
                ValidationCheck::new(
                    "no negative balance",
                    true,
                    format!("lowest closing {lowest} >= {min}"),
                )
            }
            Some(worst) => ValidationCheck::new(
                "no negative balance",
                false,
                format!(
                    "{} day(s) below {min}, first on day {}, lowest {} on day {}",
                    low.len(),
                    low[0].day,
                    worst.closing,
                    worst.day
                ),
            ),
        }
    }

    pub fn guard_check(&self, rows: &[LedgerRow]) -> ValidationCheck {
        const LABEL: &str = "guard maintained";
        let Some(g) = &self.guard else {
            return ValidationCheck::new(LABEL, true, "no guard day");
        };
        if g.day < self.first_day {
            return ValidationCheck::new(
                LABEL,
                true,
                format!("guard day {} is before the planned horizon", g.day),
            );
        }

        let before = if g.day > self.first_day {
            self.closing_on(rows, g.day - 1)
        } else {
            Some(self.opening)
        };
        let pre_bill = self
            .horizon_rows(rows)
            .find(|r| r.day == g.day)
            .map(LedgerRow::pre_bill);

        match (before, pre_bill) {
            (Some(before), Some(pre_bill)) => {
                let passed = before >= g.amount && pre_bill >= g.amount;
                ValidationCheck::new(
                    LABEL,
                    passed,
                    format!(
                        "day {} closing {before}, day {} before bills {pre_bill}, required >= {}",
                        g.day - 1,
                        g.day,
                        g.amount
                    ),
                )
            }
            _ => ValidationCheck::new(
                LABEL,
                false,
                format!("ledger is missing rows around guard day {}", g.day),
            ),
        }
    }

    pub fn lock_check(&self, rows: &[LedgerRow]) -> ValidationCheck {
        const LABEL: &str = "locks honored";
        let mut pinned = 0usize;
        let mut broken = Vec::new();
        for row in rows {
            if let Some(expected) = self.fixed(row.day) {
                pinned += 1;
                if row.action != expected {
                    broken.push(format!("day {} expected {expected} got {}", row.day, row.action));
                }
            }
        }
        if broken.is_empty() {
            ValidationCheck::new(LABEL, true, format!("{pinned} pinned day(s) unchanged"))
        } else {
            ValidationCheck::new(LABEL, false, broken.join(", "))
        }
    }
}

fn raise(slot: &mut Option<Decimal>, floor: Decimal) {
    *slot = Some(slot.map_or(floor, |f| f.max(floor)));
}
