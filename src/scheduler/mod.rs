//! Solver interface, KPI evaluation and the engine façade.
//!
//! Two interchangeable backends implement [`Solver`]:
//!
//! | Name | Backend | Strategy |
//! |------|---------|----------|
//! | `"cpsat"` | [`ExactSolver`](crate::cp::ExactSolver) | Branch-and-bound with propagation and state dominance |
//! | `"dp"` | [`DpSolver`](crate::dp::DpSolver) | Forward DP over (day, balance bucket, worked-yesterday) |
//!
//! Both return the same [`SolveOutcome`], so callers never branch on which
//! backend ran. [`Engine`] wires validation, projection, solving and the
//! validator checklist together.
//!
//! # Objective
//! Minimize work days, then back-to-back work pairs (see [`Objective`]).
//! Remaining ties resolve by day index, then shift-code order.

mod bounds;
mod checklist;
mod engine;
mod kpi;

pub use bounds::HorizonBounds;
pub use checklist::{assignment_check, checklist};
pub use engine::{Anchor, Engine, SolveResponse, ValidationReport};
pub use kpi::{Objective, ScheduleKpi};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::EngineConfig;
use crate::cp::ExactSolver;
use crate::dp::DpSolver;
use crate::error::EngineError;
use crate::models::{Actions, ConstraintModel};
use crate::projection::FlowTable;

/// Everything a solver needs for one run.
#[derive(Debug, Clone, Copy)]
pub struct Problem<'a> {
    pub model: &'a ConstraintModel,
    pub flows: &'a FlowTable,
}

impl<'a> Problem<'a> {
    pub fn new(model: &'a ConstraintModel, flows: &'a FlowTable) -> Self {
        Self { model, flows }
    }
}

/// Result of a solver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Proven optimal schedule.
    Optimal(Actions),
    /// Valid schedule, optimality not proven (budget hit or layers truncated).
    Feasible(Actions),
    /// No assignment consistent with the locks satisfies the constraints.
    Infeasible,
    /// Budget ran out before any schedule was found.
    BudgetExhausted,
}

impl SolveOutcome {
    pub fn status(&self) -> SolveStatus {
        match self {
            SolveOutcome::Optimal(_) => SolveStatus::Optimal,
            SolveOutcome::Feasible(_) => SolveStatus::Feasible,
            SolveOutcome::Infeasible => SolveStatus::Infeasible,
            SolveOutcome::BudgetExhausted => SolveStatus::BudgetExhausted,
        }
    }

    pub fn actions(&self) -> Option<&Actions> {
        match self {
            SolveOutcome::Optimal(a) | SolveOutcome::Feasible(a) => Some(a),
            _ => None,
        }
    }
}

/// Status tag of a [`SolveOutcome`], as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    BudgetExhausted,
}

impl SolveStatus {
    /// Whether a schedule accompanies this status.
    pub fn has_schedule(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// One solver run: outcome plus effort spent.
#[derive(Debug, Clone)]
pub struct SolverRun {
    pub outcome: SolveOutcome,
    /// Search nodes (exact) or state transitions (DP) evaluated.
    pub steps: u64,
}

/// A schedule solver.
///
/// Implementations must be deterministic for a fixed problem and budget,
/// must keep every day where [`ConstraintModel::fixed`] is set, and must
/// only return schedules whose projection passes the model's checks.
pub trait Solver {
    fn kind(&self) -> SolverKind;

    fn solve(&self, problem: &Problem<'_>) -> SolverRun;
}

/// Solver selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverKind {
    #[serde(rename = "cpsat")]
    Exact,
    #[serde(rename = "dp")]
    Dp,
}

impl SolverKind {
    pub const ALL: [SolverKind; 2] = [SolverKind::Exact, SolverKind::Dp];

    pub fn name(self) -> &'static str {
        match self {
            SolverKind::Exact => "cpsat",
            SolverKind::Dp => "dp",
        }
    }

    /// Instantiates the backend with its budget from `config`.
    pub fn build(self, config: &EngineConfig) -> Box<dyn Solver> {
        match self {
            SolverKind::Exact => Box::new(ExactSolver::new(config.exact.clone())),
            SolverKind::Dp => Box::new(DpSolver::new(config.dp.clone())),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverKind {
    type Err = EngineError;

    /// Exact, case-sensitive match. Unknown names are an error, never a
    /// silent default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpsat" => Ok(SolverKind::Exact),
            "dp" => Ok(SolverKind::Dp),
            other => Err(EngineError::UnrecognizedSolver(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ShiftCode, HORIZON};

    #[test]
    fn test_solver_names() {
        for kind in SolverKind::ALL {
            assert_eq!(kind.name().parse::<SolverKind>().unwrap(), kind);
        }
        assert_eq!("dp".parse::<SolverKind>().unwrap(), SolverKind::Dp);
    }

    #[test]
    fn test_unknown_solver_rejected() {
        for name in ["", "CPSAT", "greedy", "cp-sat"] {
            assert_eq!(
                name.parse::<SolverKind>(),
                Err(EngineError::UnrecognizedSolver(name.to_string()))
            );
        }
    }

    #[test]
    fn test_outcome_status() {
        let actions = [ShiftCode::O; HORIZON];
        assert_eq!(SolveOutcome::Optimal(actions).status(), SolveStatus::Optimal);
        assert!(SolveOutcome::Feasible(actions).actions().is_some());
        assert!(SolveOutcome::Infeasible.actions().is_none());
        assert!(!SolveStatus::BudgetExhausted.has_schedule());
        assert!(SolveStatus::Feasible.has_schedule());
    }

    #[test]
    fn test_build_reports_kind() {
        let config = EngineConfig::default();
        for kind in SolverKind::ALL {
            assert_eq!(kind.build(&config).kind(), kind);
        }
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SolveStatus::BudgetExhausted).unwrap(),
            "\"budget_exhausted\""
        );
        assert_eq!(serde_json::to_string(&SolverKind::Exact).unwrap(), "\"cpsat\"");
    }
}
