//! Ledger projection.
//!
//! Turns a plan plus an action sequence into the day-by-day balance trace.
//! This is the only place balances are computed: both solvers step through
//! days with [`FlowTable::closing`], and the validator re-projects with
//! [`project`], so the arithmetic can never disagree.
//!
//! # Algorithm
//! For each day `d`: `net = earning(action) + deposits(d) - bills(d) +
//! adjustments(d)` and `closing = opening + net`; the next day opens at
//! this closing. One left-to-right pass, O(30), no hidden state.

use rust_decimal::Decimal;

use crate::config::EarningTable;
use crate::models::{idx, Actions, Day, LedgerRow, Plan, SeedActions, ShiftCode, HORIZON};

/// Per-day flow totals of a plan, paired with the earning table.
///
/// Built once per solve; cheap to query from inner search loops.
#[derive(Debug, Clone)]
pub struct FlowTable {
    earnings: EarningTable,
    deposits: [Decimal; HORIZON],
    bills: [Decimal; HORIZON],
    adjustments: [Decimal; HORIZON],
}

impl FlowTable {
    /// Aggregates the plan's deposits, bills and adjustments by day.
    pub fn new(plan: &Plan, earnings: &EarningTable) -> Self {
        let mut deposits = [Decimal::ZERO; HORIZON];
        let mut bills = [Decimal::ZERO; HORIZON];
        let mut adjustments = [Decimal::ZERO; HORIZON];
        for day in crate::models::all_days() {
            deposits[idx(day)] = plan.deposit_total(day);
            bills[idx(day)] = plan.bill_total(day);
            adjustments[idx(day)] = plan.adjustment_total(day);
        }
        Self {
            earnings: earnings.clone(),
            deposits,
            bills,
            adjustments,
        }
    }

    /// Earning table in use.
    pub fn earnings(&self) -> &EarningTable {
        &self.earnings
    }

    /// Earning for `code`.
    #[inline]
    pub fn earning(&self, code: ShiftCode) -> Decimal {
        self.earnings.rate(code)
    }

    /// Net flow of `day` excluding the action's earning.
    #[inline]
    pub fn base(&self, day: Day) -> Decimal {
        let i = idx(day);
        self.deposits[i] - self.bills[i] + self.adjustments[i]
    }

    /// Closing balance of `day` when it opens at `opening` and runs `code`.
    #[inline]
    pub fn closing(&self, opening: Decimal, day: Day, code: ShiftCode) -> Decimal {
        opening + self.earning(code) + self.base(day)
    }

    /// Full ledger row for one day.
    pub fn row(&self, opening: Decimal, day: Day, code: ShiftCode) -> LedgerRow {
        let i = idx(day);
        LedgerRow {
            day,
            opening,
            deposits: self.deposits[i],
            action: code,
            earnings: self.earning(code),
            bills: self.bills[i],
            adjustment: self.adjustments[i],
            closing: self.closing(opening, day, code),
        }
    }

    /// Projects days `first_day..=30` starting from `opening`.
    pub fn project_from(&self, actions: &Actions, first_day: Day, opening: Decimal) -> Vec<LedgerRow> {
        let mut rows = Vec::with_capacity(HORIZON);
        let mut balance = opening;
        for day in first_day..=HORIZON as Day {
            let row = self.row(balance, day, actions[idx(day)]);
            balance = row.closing;
            rows.push(row);
        }
        rows
    }
}

/// Projects a full 30-day ledger from the plan's start balance.
///
/// # Example
/// ```
/// use cashflow_schedule::config::EarningTable;
/// use cashflow_schedule::models::{Plan, ShiftCode, HORIZON};
/// use cashflow_schedule::projection::project;
/// use rust_decimal::Decimal;
///
/// let plan = Plan::new(Decimal::from(100), Decimal::ZERO, Decimal::ZERO)
///     .with_bill(3, "phone", Decimal::from(40));
/// let mut actions = [ShiftCode::O; HORIZON];
/// actions[0] = ShiftCode::S;
///
/// let ledger = project(&plan, &actions, &EarningTable::default());
/// assert_eq!(ledger.len(), 30);
/// assert_eq!(ledger[0].closing, Decimal::from(175));
/// assert_eq!(ledger[2].closing, Decimal::from(135));
/// ```
pub fn project(plan: &Plan, actions: &Actions, earnings: &EarningTable) -> Vec<LedgerRow> {
    FlowTable::new(plan, earnings).project_from(actions, 1, plan.start_balance)
}

/// Fills unassigned slots with `O`.
pub fn fill_unassigned(seed: &SeedActions) -> Actions {
    let mut actions = [ShiftCode::O; HORIZON];
    for (slot, code) in actions.iter_mut().zip(seed.iter()) {
        *slot = code.unwrap_or(ShiftCode::O);
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_plan() -> Plan {
        Plan::new(dec!(90.5), dec!(490.5), dec!(25))
            .with_deposit(11, dec!(1000))
            .with_deposit(11, dec!(21))
            .with_bill(30, "Rent", dec!(1636))
            .with_bill(15, "Phone", dec!(45.25))
            .with_adjustment(15, dec!(-4.75), Some("fee"))
    }

    #[test]
    fn test_project_all_off() {
        let plan = sample_plan();
        let ledger = project(&plan, &[ShiftCode::O; HORIZON], &EarningTable::default());
        assert_eq!(ledger.len(), HORIZON);
        assert_eq!(ledger[0].opening, dec!(90.5));
        assert_eq!(ledger[10].deposits, dec!(1021));
        assert_eq!(ledger[10].closing, dec!(1111.5));
        assert_eq!(ledger[14].bills, dec!(45.25));
        assert_eq!(ledger[14].adjustment, dec!(-4.75));
        assert_eq!(ledger[14].closing, dec!(1061.5));
        assert_eq!(ledger[29].closing, dec!(-574.5));
    }

    #[test]
    fn test_rows_chain() {
        let plan = sample_plan();
        let mut actions = [ShiftCode::O; HORIZON];
        actions[3] = ShiftCode::L;
        actions[20] = ShiftCode::SS;
        let ledger = project(&plan, &actions, &EarningTable::default());
        for pair in ledger.windows(2) {
            assert_eq!(pair[0].closing, pair[1].opening);
        }
        for row in &ledger {
            assert_eq!(
                row.closing,
                row.opening + row.earnings + row.deposits - row.bills + row.adjustment
            );
        }
        assert_eq!(ledger[3].earnings, dec!(125));
        assert_eq!(ledger[29].closing, dec!(-574.5) + dec!(125) + dec!(150));
    }

    #[test]
    fn test_projection_is_deterministic() {
        let plan = sample_plan();
        let mut actions = [ShiftCode::M; HORIZON];
        actions[7] = ShiftCode::O;
        let a = project(&plan, &actions, &EarningTable::default());
        let b = project(&plan, &actions, &EarningTable::default());
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_custom_earning_table() {
        let plan = Plan::new(dec!(0), dec!(0), dec!(0));
        let table = EarningTable::new(dec!(1.5), dec!(2), dec!(3), dec!(4.25));
        let mut actions = [ShiftCode::O; HORIZON];
        actions[0] = ShiftCode::SS;
        actions[1] = ShiftCode::S;
        let ledger = project(&plan, &actions, &table);
        assert_eq!(ledger[1].closing, dec!(5.75));
    }

    #[test]
    fn test_project_from_anchor() {
        let plan = sample_plan();
        let flows = FlowTable::new(&plan, &EarningTable::default());
        let rows = flows.project_from(&[ShiftCode::O; HORIZON], 29, dec!(2000));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].day, 29);
        assert_eq!(rows[0].opening, dec!(2000));
        assert_eq!(rows[1].closing, dec!(364));
        assert!(flows.project_from(&[ShiftCode::O; HORIZON], 31, dec!(5)).is_empty());
    }

    #[test]
    fn test_fill_unassigned() {
        let mut seed = [None; HORIZON];
        seed[4] = Some(ShiftCode::L);
        let actions = fill_unassigned(&seed);
        assert_eq!(actions[4], ShiftCode::L);
        assert_eq!(actions[0], ShiftCode::O);
    }
}
