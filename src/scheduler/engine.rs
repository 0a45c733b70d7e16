//! Engine façade: solve, re-anchor and validate.
//!
//! Every entry point validates its input first, builds the constraint model
//! and flow table, runs the selected [`Solver`](super::Solver) and returns a
//! [`SolveResponse`] whose shape does not depend on the solver chosen.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::{
    assignment_check, checklist, HorizonBounds, Problem, ScheduleKpi, SolveStatus, SolverKind,
    SolverRun,
};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{
    Actions, ConstraintModel, Day, LedgerRow, Plan, SeedActions, ValidationCheck, HORIZON,
};
use crate::projection::{fill_unassigned, project, FlowTable};
use crate::validation::{
    amount_in_range, parse_plan, require_recorded_actions, too_large, validate_plan,
    ValidationError, ValidationErrorKind,
};

/// Observed balance a re-planned horizon starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// Last frozen day.
    pub through_day: Day,
    /// Real closing balance of `through_day`.
    pub observed_balance: Decimal,
}

/// Result envelope of `solve` and `resolve`, identical for every solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResponse {
    pub solver: SolverKind,
    pub status: SolveStatus,
    /// Full 30-day schedule; `None` unless a schedule was found.
    pub actions: Option<Actions>,
    /// Day-by-day trace of `actions`; empty when there is no schedule.
    pub ledger: Vec<LedgerRow>,
    pub kpi: Option<ScheduleKpi>,
    pub final_balance: Option<Decimal>,
    /// Validator checklist for the returned schedule.
    pub checks: Vec<ValidationCheck>,
    /// Search effort spent by the solver.
    pub steps: u64,
    pub anchor: Option<Anchor>,
    /// Human-readable outcome summary.
    pub detail: String,
    /// The plan's metadata, passed through unchanged.
    pub metadata: BTreeMap<String, String>,
}

/// Result of checking a caller-supplied schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ledger: Vec<LedgerRow>,
    pub checks: Vec<ValidationCheck>,
    /// Whether every check passed.
    pub passed: bool,
    pub kpi: ScheduleKpi,
}

/// Stateless planning engine.
///
/// Holds only configuration; every call owns its working state, so one
/// engine can serve concurrent requests.
///
/// # Example
/// ```
/// use cashflow_schedule::models::Plan;
/// use cashflow_schedule::scheduler::{Engine, SolveStatus};
/// use rust_decimal::Decimal;
///
/// let plan = Plan::new(Decimal::from(90), Decimal::from(490), Decimal::from(25))
///     .with_deposit(11, Decimal::from(1000))
///     .with_bill(30, "Rent", Decimal::from(1600));
///
/// let engine = Engine::default();
/// let response = engine.solve(&plan, "dp").unwrap();
/// assert_eq!(response.status, SolveStatus::Optimal);
/// assert!(response.checks.iter().all(|c| c.passed));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine after checking the configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Schedules the whole horizon.
    ///
    /// # Errors
    /// [`EngineError::UnrecognizedSolver`] for an unknown `solver`, and
    /// [`EngineError::Validation`] for a malformed plan. Infeasible plans are
    /// not errors; they come back with [`SolveStatus::Infeasible`].
    pub fn solve(&self, plan: &Plan, solver: &str) -> Result<SolveResponse> {
        let kind: SolverKind = solver.parse()?;
        validate_plan(plan)?;

        let model = ConstraintModel::new(plan, self.config.min_balance);
        let flows = FlowTable::new(plan, &self.config.earnings);
        info!(solver = %kind, "solve requested");
        let run = kind.build(&self.config).solve(&Problem::new(&model, &flows));
        Ok(self.respond(plan, kind, &model, &flows, run, Vec::new(), None))
    }

    /// Parses an untyped payload, then solves it.
    pub fn solve_payload(&self, payload: &Value, solver: &str) -> Result<SolveResponse> {
        let _: SolverKind = solver.parse()?;
        let plan = parse_plan(payload)?;
        self.solve(&plan, solver)
    }

    /// Re-plans days `through_day+1..=30` from an observed balance.
    ///
    /// Days `1..=through_day` keep their recorded actions and their
    /// originally projected ledger rows; the suffix is solved and projected
    /// from `observed`.
    ///
    /// # Errors
    /// Besides the [`solve`](Self::solve) errors, a `through_day` outside
    /// `1..=30` and missing recorded actions in the frozen prefix are
    /// validation errors.
    pub fn resolve(
        &self,
        plan: &Plan,
        through_day: Day,
        observed: Decimal,
        solver: &str,
    ) -> Result<SolveResponse> {
        let kind: SolverKind = solver.parse()?;
        if !(1..=HORIZON as Day).contains(&through_day) {
            return Err(EngineError::Validation(vec![ValidationError::new(
                "through_day",
                ValidationErrorKind::DayOutOfRange,
                format!("day {through_day} is outside 1..=30"),
            )]));
        }
        if !amount_in_range(observed) {
            return Err(EngineError::Validation(vec![ValidationError::new(
                "observed_balance",
                ValidationErrorKind::AmountOutOfRange,
                too_large(observed),
            )]));
        }
        validate_plan(plan)?;
        require_recorded_actions(plan, through_day)?;

        let model = ConstraintModel::anchored(plan, self.config.min_balance, through_day, observed);
        let flows = FlowTable::new(plan, &self.config.earnings);
        let prefix: Vec<LedgerRow> = flows
            .project_from(&fill_unassigned(&plan.actions), 1, plan.start_balance)
            .into_iter()
            .take(usize::from(through_day))
            .collect();

        info!(solver = %kind, through_day, %observed, "re-anchoring");
        let run = kind.build(&self.config).solve(&Problem::new(&model, &flows));
        let anchor = Anchor {
            through_day,
            observed_balance: observed,
        };
        Ok(self.respond(plan, kind, &model, &flows, run, prefix, Some(anchor)))
    }

    /// Checks a caller-supplied schedule against the plan.
    ///
    /// Unassigned days are projected as `O` and reported by the leading
    /// `actions assigned` check. Nothing is mutated.
    pub fn validate(&self, plan: &Plan, actions: &SeedActions) -> Result<ValidationReport> {
        validate_plan(plan)?;
        let model = ConstraintModel::new(plan, self.config.min_balance);
        let filled = fill_unassigned(actions);
        let ledger = project(plan, &filled, &self.config.earnings);
        let checks = checklist(&model, &ledger, assignment_check(actions));
        let passed = checks.iter().all(|c| c.passed);
        Ok(ValidationReport {
            kpi: ScheduleKpi::calculate(&filled, &ledger),
            ledger,
            checks,
            passed,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn respond(
        &self,
        plan: &Plan,
        kind: SolverKind,
        model: &ConstraintModel,
        flows: &FlowTable,
        run: SolverRun,
        prefix: Vec<LedgerRow>,
        anchor: Option<Anchor>,
    ) -> SolveResponse {
        let status = run.outcome.status();
        let mut response = SolveResponse {
            solver: kind,
            status,
            actions: None,
            ledger: Vec::new(),
            kpi: None,
            final_balance: None,
            checks: Vec::new(),
            steps: run.steps,
            anchor,
            detail: String::new(),
            metadata: plan.metadata.clone(),
        };

        let Some(actions) = run.outcome.actions() else {
            response.detail = match status {
                SolveStatus::BudgetExhausted => format!(
                    "search budget exhausted after {} steps before any schedule was found",
                    run.steps
                ),
                _ => diagnose(model, flows),
            };
            info!(solver = %kind, ?status, detail = %response.detail, "no schedule");
            return response;
        };

        let mut ledger = prefix;
        ledger.extend(flows.project_from(actions, model.first_day(), model.opening()));
        let final_balance = model.final_balance(&ledger);
        let mut kpi = ScheduleKpi::calculate(actions, &ledger);
        kpi.final_balance = final_balance;
        let checks = checklist(model, &ledger, assignment_check(&actions.map(Some)));

        let failed: Vec<&str> = checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.label.as_str())
            .collect();
        if !failed.is_empty() {
            warn!(solver = %kind, ?failed, "solver schedule failed validation");
        }

        response.detail = match status {
            SolveStatus::Optimal => format!(
                "optimal: {} work day(s), {} back-to-back pair(s)",
                kpi.work_days, kpi.back_to_back
            ),
            _ => format!(
                "feasible, optimality not proven: {} work day(s), {} back-to-back pair(s)",
                kpi.work_days, kpi.back_to_back
            ),
        };
        info!(
            solver = %kind,
            ?status,
            work_days = kpi.work_days,
            back_to_back = kpi.back_to_back,
            %final_balance,
            steps = run.steps,
            "schedule found"
        );

        response.actions = Some(*actions);
        response.ledger = ledger;
        response.kpi = Some(kpi);
        response.final_balance = Some(final_balance);
        response.checks = checks;
        response
    }
}

/// Explains an infeasible model in caller terms.
fn diagnose(model: &ConstraintModel, flows: &FlowTable) -> String {
    if !model.opening_ok() {
        if let Some(guard) = model.guard() {
            return format!(
                "opening balance {} is below the guard {} required before day {}",
                model.opening(),
                guard.amount,
                guard.day
            );
        }
    }
    let bounds = HorizonBounds::new(model, flows);
    let (lo, hi) = model.band();
    if bounds
        .remaining_work(model, model.first_day() - 1, model.opening())
        .is_none()
    {
        return format!(
            "no schedule satisfies the target band [{lo}, {hi}] and the balance floors given these bills and locks"
        );
    }
    format!(
        "no assignment consistent with the locks reaches the target band [{lo}, {hi}] exactly within the floors"
    )
}
