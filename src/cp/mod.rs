//! Exact schedule solver (constraint-programming style).
//!
//! One decision variable per free day, domain = the shift-code alphabet.
//! The search is a depth-first branch-and-bound over days in order:
//!
//! 1. **Propagation**: every candidate value is stepped through the ledger
//!    arithmetic and rejected when the closing balance breaks that day's
//!    floor, or when [`HorizonBounds`] shows the floors or the target band
//!    can no longer be met by any completion.
//! 2. **Bounding**: the same bounds give a lower bound on the remaining work
//!    days; branches that cannot beat the incumbent objective are cut.
//! 3. **Dominance**: the future of a partial schedule depends only on
//!    `(day, closing balance, worked today)`. Reaching a state already seen
//!    with an objective no worse than the current one cuts the branch.
//!
//! Values are tried in shift-code order (`O` first) and an incumbent is
//! replaced only by a strictly better objective, so the result is the
//! first optimal schedule in (day, code) lexicographic order and identical
//! on every run under the same step budget.
//!
//! # Reference
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"
//! - Ibaraki (1977), "The power of dominance relations in branch-and-bound
//!   algorithms"

use rust_decimal::Decimal;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::ExactConfig;
use crate::models::{idx, Actions, ConstraintModel, Day, ShiftCode, HORIZON};
use crate::projection::FlowTable;
use crate::scheduler::{
    HorizonBounds, Objective, Problem, SolveOutcome, Solver, SolverKind, SolverRun,
};

/// Steps between wall-clock checks.
const CLOCK_INTERVAL: u64 = 1024;

/// Branch-and-bound solver with a step budget.
///
/// # Example
/// ```
/// use cashflow_schedule::config::{EarningTable, ExactConfig};
/// use cashflow_schedule::cp::ExactSolver;
/// use cashflow_schedule::models::{ConstraintModel, Plan};
/// use cashflow_schedule::projection::FlowTable;
/// use cashflow_schedule::scheduler::{Problem, SolveStatus, Solver};
/// use rust_decimal::Decimal;
///
/// let plan = Plan::new(Decimal::ZERO, Decimal::from(300), Decimal::ZERO);
/// let model = ConstraintModel::new(&plan, Some(Decimal::ZERO));
/// let flows = FlowTable::new(&plan, &EarningTable::default());
///
/// let run = ExactSolver::new(ExactConfig::default()).solve(&Problem::new(&model, &flows));
/// assert_eq!(run.outcome.status(), SolveStatus::Optimal);
/// ```
#[derive(Debug, Clone)]
pub struct ExactSolver {
    config: ExactConfig,
}

impl ExactSolver {
    pub fn new(config: ExactConfig) -> Self {
        Self { config }
    }
}

impl Solver for ExactSolver {
    fn kind(&self) -> SolverKind {
        SolverKind::Exact
    }

    fn solve(&self, problem: &Problem<'_>) -> SolverRun {
        let model = problem.model;
        let bounds = HorizonBounds::new(model, problem.flows);
        let start_day = model.first_day();

        let root_ok = model.opening_ok()
            && bounds
                .remaining_work(model, start_day - 1, model.opening())
                .is_some();
        if !root_ok {
            debug!(first_day = start_day, "exact solver: infeasible at root");
            return SolverRun {
                outcome: SolveOutcome::Infeasible,
                steps: 0,
            };
        }

        let mut search = Search::new(model, problem.flows, bounds, &self.config);
        search.branch(
            start_day,
            model.opening(),
            model.worked_before_start(),
            Objective::default(),
        );

        let outcome = match (search.best, search.aborted) {
            (Some((_, actions)), false) => SolveOutcome::Optimal(actions),
            (Some((_, actions)), true) => SolveOutcome::Feasible(actions),
            (None, false) => SolveOutcome::Infeasible,
            (None, true) => SolveOutcome::BudgetExhausted,
        };
        info!(
            solver = "cpsat",
            status = ?outcome.status(),
            steps = search.steps,
            states = search.seen.len(),
            objective = ?search.best.map(|(o, _)| o),
            "exact solver finished"
        );
        SolverRun {
            outcome,
            steps: search.steps,
        }
    }
}

/// Mutable search state for one run.
struct Search<'a> {
    model: &'a ConstraintModel,
    flows: &'a FlowTable,
    bounds: HorizonBounds,
    max_steps: u64,
    deadline: Option<Instant>,
    steps: u64,
    aborted: bool,
    current: Actions,
    best: Option<(Objective, Actions)>,
    /// Best objective seen on arrival at (day, closing, worked).
    seen: HashMap<(Day, Decimal, bool), Objective>,
}

impl<'a> Search<'a> {
    fn new(
        model: &'a ConstraintModel,
        flows: &'a FlowTable,
        bounds: HorizonBounds,
        config: &ExactConfig,
    ) -> Self {
        let mut current = [ShiftCode::O; HORIZON];
        for day in crate::models::all_days() {
            if let Some(code) = model.fixed(day) {
                current[idx(day)] = code;
            }
        }
        Self {
            model,
            flows,
            bounds,
            max_steps: config.max_steps,
            deadline: config
                .time_limit_ms
                .map(|ms| Instant::now() + Duration::from_millis(ms)),
            steps: 0,
            aborted: false,
            current,
            best: None,
            seen: HashMap::new(),
        }
    }

    /// Counts a step; flags the search aborted once the budget is spent.
    fn tick(&mut self) -> bool {
        self.steps += 1;
        if self.steps > self.max_steps {
            self.aborted = true;
        } else if self.steps % CLOCK_INTERVAL == 0 {
            if let Some(deadline) = self.deadline {
                self.aborted = Instant::now() >= deadline;
            }
        }
        !self.aborted
    }

    /// Decides `day`, which opens at `balance`.
    fn branch(&mut self, day: Day, balance: Decimal, prev_worked: bool, cost: Objective) {
        if usize::from(day) > HORIZON {
            if self.model.in_band(balance) && self.best.as_ref().map_or(true, |(b, _)| cost < *b) {
                debug!(work_days = cost.work_days, back_to_back = cost.back_to_back, "new incumbent");
                self.best = Some((cost, self.current));
            }
            return;
        }

        let pinned = self.model.fixed(day);
        let choices: &[ShiftCode] = match &pinned {
            Some(code) => std::slice::from_ref(code),
            None => &ShiftCode::ALL,
        };

        for &code in choices {
            if !self.tick() {
                return;
            }

            let closing = self.flows.closing(balance, day, code);
            if !self.model.closing_ok(day, closing) {
                continue;
            }
            let Some(rest) = self.bounds.remaining_work(self.model, day, closing) else {
                continue;
            };

            let worked = code.is_work();
            let next = cost.step(prev_worked, worked);
            if let Some((best, _)) = &self.best {
                let lower = Objective {
                    work_days: next.work_days + rest,
                    back_to_back: next.back_to_back,
                };
                if lower >= *best {
                    continue;
                }
            }

            match self.seen.entry((day, closing, worked)) {
                Entry::Occupied(e) if *e.get() <= next => continue,
                Entry::Occupied(mut e) => {
                    e.insert(next);
                }
                Entry::Vacant(e) => {
                    e.insert(next);
                }
            }

            self.current[idx(day)] = code;
            self.branch(day + 1, closing, worked, next);
            if self.aborted {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EarningTable;
    use crate::models::Plan;
    use crate::projection::project;
    use crate::scheduler::SolveStatus;
    use rust_decimal_macros::dec;

    fn run(plan: &Plan, config: ExactConfig) -> SolverRun {
        let model = ConstraintModel::new(plan, Some(dec!(0)));
        let flows = FlowTable::new(plan, &EarningTable::default());
        ExactSolver::new(config).solve(&Problem::new(&model, &flows))
    }

    fn rent_plan() -> Plan {
        Plan::new(dec!(90.5), dec!(490.5), dec!(25))
            .with_rent_guard(dec!(1636))
            .with_deposit(11, dec!(1021))
            .with_bill(30, "Rent", dec!(1636))
    }

    #[test]
    fn test_rent_scenario_optimal() {
        let plan = rent_plan();
        let result = run(&plan, ExactConfig::default());
        let SolveOutcome::Optimal(actions) = result.outcome else {
            panic!("expected optimal, got {:?}", result.outcome);
        };

        let objective = Objective::of(&actions, false);
        // Needs 990..=1040 in earnings; 6 days top out at 900.
        assert_eq!(objective.work_days, 7);
        assert_eq!(objective.back_to_back, 0);

        let ledger = project(&plan, &actions, &EarningTable::default());
        let model = ConstraintModel::new(&plan, Some(dec!(0)));
        let (ok, reasons) = model.is_feasible(&ledger);
        assert!(ok, "{reasons:?}");
    }

    #[test]
    fn test_no_work_needed() {
        let plan = Plan::new(dec!(100), dec!(100), dec!(0));
        let result = run(&plan, ExactConfig::default());
        assert_eq!(result.outcome, SolveOutcome::Optimal([ShiftCode::O; HORIZON]));
    }

    #[test]
    fn test_lexicographic_tie_break() {
        // One short shift reaches the target exactly.
        let plan = Plan::new(dec!(0), dec!(75), dec!(0));
        let result = run(&plan, ExactConfig::default());
        let mut expected = [ShiftCode::O; HORIZON];
        expected[HORIZON - 1] = ShiftCode::S;
        // O is tried first on every day, so the single shift lands last.
        assert_eq!(result.outcome, SolveOutcome::Optimal(expected));
    }

    #[test]
    fn test_infeasible_target() {
        let plan = Plan::new(dec!(0), dec!(10000), dec!(0));
        let result = run(&plan, ExactConfig::default());
        assert_eq!(result.outcome, SolveOutcome::Infeasible);
        assert_eq!(result.steps, 0);
    }

    #[test]
    fn test_infeasible_by_parity() {
        // All rates are multiples of 25; 10 can never be hit exactly.
        let plan = Plan::new(dec!(0), dec!(10), dec!(0));
        let result = run(&plan, ExactConfig::default());
        assert_eq!(result.outcome, SolveOutcome::Infeasible);
        assert!(result.steps > 0);
    }

    #[test]
    fn test_locks_kept() {
        let plan = rent_plan().with_actions(5, 10, ShiftCode::O).with_lock(5, 10);
        let result = run(&plan, ExactConfig::default());
        let actions = result.outcome.actions().copied().unwrap();
        assert!(actions[4..10].iter().all(|&c| c == ShiftCode::O));
    }

    #[test]
    fn test_locked_work_day_kept() {
        let plan = Plan::new(dec!(0), dec!(150), dec!(0))
            .with_action(3, ShiftCode::SS)
            .with_lock(3, 3);
        let result = run(&plan, ExactConfig::default());
        let actions = result.outcome.actions().copied().unwrap();
        assert_eq!(actions[2], ShiftCode::SS);
        assert_eq!(Objective::of(&actions, false).work_days, 1);
    }

    #[test]
    fn test_budget_exhausted() {
        let config = ExactConfig {
            max_steps: 3,
            time_limit_ms: None,
        };
        let result = run(&rent_plan(), config);
        assert_eq!(result.outcome.status(), SolveStatus::BudgetExhausted);
    }

    #[test]
    fn test_budget_keeps_incumbent() {
        // Enough steps to reach the first leaf, not enough to prove it.
        let config = ExactConfig {
            max_steps: 100,
            time_limit_ms: None,
        };
        let result = run(&rent_plan(), config);
        match &result.outcome {
            SolveOutcome::Feasible(actions) => {
                let ledger = project(&rent_plan(), actions, &EarningTable::default());
                let model = ConstraintModel::new(&rent_plan(), Some(dec!(0)));
                assert!(model.is_feasible(&ledger).0);
            }
            other => panic!("expected feasible, got {other:?}"),
        }
    }

    #[test]
    fn test_time_limit_stops_search() {
        // Earnings must total exactly 1010, which no multiple of 25 hits,
        // so the search runs far past the first clock check.
        let plan = Plan::new(dec!(90.5), dec!(485.5), dec!(0))
            .with_rent_guard(dec!(1636))
            .with_deposit(11, dec!(1021))
            .with_bill(30, "Rent", dec!(1636));

        let exhaustive = run(&plan, ExactConfig::default());
        assert_eq!(exhaustive.outcome, SolveOutcome::Infeasible);
        assert!(exhaustive.steps > CLOCK_INTERVAL);

        let config = ExactConfig {
            max_steps: 2_000_000,
            time_limit_ms: Some(0),
        };
        let result = run(&plan, config);
        assert_eq!(result.outcome.status(), SolveStatus::BudgetExhausted);
        assert_eq!(result.steps, CLOCK_INTERVAL);
    }

    #[test]
    fn test_deterministic() {
        let plan = rent_plan().with_adjustment(7, dec!(-12.5), None);
        let a = run(&plan, ExactConfig::default());
        let b = run(&plan, ExactConfig::default());
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.steps, b.steps);
    }
}
