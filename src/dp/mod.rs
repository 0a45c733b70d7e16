//! Dynamic-programming schedule solver.
//!
//! Forward DP over layers, one per day. A state is
//! `(balance bucket, worked today)`: the future of a partial schedule
//! depends on nothing else, so among all partial schedules reaching the
//! same state only the one with the smallest [`Objective`] is kept.
//!
//! # Grid
//! Balances are bucketed as `(balance - opening) / resolution`. When every
//! per-day flow and every shift earning is a multiple of the configured
//! resolution, buckets and balances correspond one to one and no two
//! distinct balances are ever merged. Otherwise the grid is refined to the
//! finest decimal scale present in the instance, which restores that
//! property. A feasible instance is therefore never reported infeasible
//! because of discretization.
//!
//! # Budget
//! Layers larger than `max_states_per_day` are cut down to their best
//! states by objective. A truncated run tags its schedule `Feasible`
//! (optimality is no longer guaranteed) and reports `BudgetExhausted`
//! instead of `Infeasible` when no terminal state survives.
//!
//! # Reference
//! - Bellman (1957), "Dynamic Programming"
//! - Held & Karp (1962), "A Dynamic Programming Approach to Sequencing Problems"

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::DpConfig;
use crate::models::{idx, ConstraintModel, ShiftCode, HORIZON};
use crate::projection::FlowTable;
use crate::scheduler::{
    HorizonBounds, Objective, Problem, SolveOutcome, Solver, SolverKind, SolverRun,
};

/// `(balance bucket, worked on this day)`.
type Key = (i64, bool);

type Layer = BTreeMap<Key, Node>;

#[derive(Debug, Clone, Copy)]
struct Node {
    balance: Decimal,
    objective: Objective,
    /// State in the previous layer this one was reached from.
    parent: Key,
    action: ShiftCode,
}

/// Layered DP solver.
///
/// # Example
/// ```
/// use cashflow_schedule::config::{DpConfig, EarningTable};
/// use cashflow_schedule::dp::DpSolver;
/// use cashflow_schedule::models::{ConstraintModel, Plan};
/// use cashflow_schedule::projection::FlowTable;
/// use cashflow_schedule::scheduler::{Problem, Solver};
/// use rust_decimal::Decimal;
///
/// let plan = Plan::new(Decimal::ZERO, Decimal::from(250), Decimal::ZERO);
/// let model = ConstraintModel::new(&plan, Some(Decimal::ZERO));
/// let flows = FlowTable::new(&plan, &EarningTable::default());
///
/// let run = DpSolver::new(DpConfig::default()).solve(&Problem::new(&model, &flows));
/// let actions = run.outcome.actions().unwrap();
/// assert_eq!(actions.iter().filter(|c| c.is_work()).count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct DpSolver {
    config: DpConfig,
}

impl DpSolver {
    pub fn new(config: DpConfig) -> Self {
        Self { config }
    }
}

impl Solver for DpSolver {
    fn kind(&self) -> SolverKind {
        SolverKind::Dp
    }

    fn solve(&self, problem: &Problem<'_>) -> SolverRun {
        let model = problem.model;
        let flows = problem.flows;
        let bounds = HorizonBounds::new(model, flows);
        let start_day = model.first_day();

        let root_ok = model.opening_ok()
            && bounds
                .remaining_work(model, start_day - 1, model.opening())
                .is_some();
        if !root_ok {
            debug!(first_day = start_day, "dp solver: infeasible at root");
            return SolverRun {
                outcome: SolveOutcome::Infeasible,
                steps: 0,
            };
        }

        let grid = Grid::new(self.config.resolution, model, flows);
        let root_key = (0, model.worked_before_start());
        let mut layers: Vec<Layer> = Vec::with_capacity(HORIZON + 1);
        layers.push(Layer::from([(
            root_key,
            Node {
                balance: model.opening(),
                objective: Objective::default(),
                parent: root_key,
                action: ShiftCode::O,
            },
        )]));

        let mut steps = 0u64;
        let mut degraded = false;
        let mut peak = 1usize;

        for day in model.days() {
            let pinned = model.fixed(day);
            let choices: &[ShiftCode] = match &pinned {
                Some(code) => std::slice::from_ref(code),
                None => &ShiftCode::ALL,
            };

            let mut next = Layer::new();
            for (&key, node) in layers.last().into_iter().flatten() {
                for &code in choices {
                    steps += 1;
                    let closing = flows.closing(node.balance, day, code);
                    if !model.closing_ok(day, closing)
                        || bounds.remaining_work(model, day, closing).is_none()
                    {
                        continue;
                    }
                    let Some(bucket) = grid.bucket(closing) else {
                        degraded = true;
                        continue;
                    };

                    let worked = code.is_work();
                    let candidate = Node {
                        balance: closing,
                        objective: node.objective.step(key.1, worked),
                        parent: key,
                        action: code,
                    };
                    match next.entry((bucket, worked)) {
                        Entry::Vacant(e) => {
                            e.insert(candidate);
                        }
                        Entry::Occupied(mut e) => {
                            if candidate.objective < e.get().objective {
                                e.insert(candidate);
                            }
                        }
                    }
                }
            }

            peak = peak.max(next.len());
            if next.len() > self.config.max_states_per_day {
                debug!(day, states = next.len(), "dp layer truncated");
                truncate(&mut next, self.config.max_states_per_day);
                degraded = true;
            }
            if next.is_empty() {
                debug!(day, "dp layer empty");
                break;
            }
            layers.push(next);
        }

        let completed = layers.len() == model.days().count() + 1;
        let terminal = if completed {
            layers.last().and_then(|layer| {
                layer
                    .iter()
                    .filter(|(_, node)| model.in_band(node.balance))
                    .min_by_key(|(key, node)| (node.objective, **key))
                    .map(|(key, node)| (*key, node.objective))
            })
        } else {
            None
        };

        let found = terminal.map(|(key, objective)| (objective, backtrack(model, &layers, key)));
        let outcome = match (found, degraded) {
            (Some((_, actions)), false) => SolveOutcome::Optimal(actions),
            (Some((_, actions)), true) => SolveOutcome::Feasible(actions),
            (None, false) => SolveOutcome::Infeasible,
            (None, true) => SolveOutcome::BudgetExhausted,
        };
        info!(
            solver = "dp",
            status = ?outcome.status(),
            steps,
            peak_states = peak,
            resolution = %grid.step,
            refined = grid.refined,
            objective = ?found.map(|(o, _)| o),
            "dp solver finished"
        );
        SolverRun { outcome, steps }
    }
}

/// Bucket grid for one instance.
#[derive(Debug, Clone)]
struct Grid {
    origin: Decimal,
    step: Decimal,
    refined: bool,
}

impl Grid {
    fn new(resolution: Decimal, model: &ConstraintModel, flows: &FlowTable) -> Self {
        let amounts: Vec<Decimal> = model
            .days()
            .map(|day| flows.base(day))
            .chain(ShiftCode::ALL.iter().map(|&c| flows.earning(c)))
            .collect();

        let on_grid = resolution > Decimal::ZERO
            && amounts.iter().all(|a| a.checked_rem(resolution).is_some_and(|r| r.is_zero()));
        if on_grid {
            return Self {
                origin: model.opening(),
                step: resolution,
                refined: false,
            };
        }

        let scale = amounts
            .iter()
            .map(Decimal::scale)
            .chain(std::iter::once(resolution.scale()))
            .max()
            .unwrap_or(0);
        let step = Decimal::new(1, scale);
        debug!(configured = %resolution, refined = %step, "dp grid refined to instance scale");
        Self {
            origin: model.opening(),
            step,
            refined: true,
        }
    }

    fn bucket(&self, balance: Decimal) -> Option<i64> {
        let bucket = (balance - self.origin).checked_div(self.step)?.floor().to_i64();
        if bucket.is_none() {
            warn!(%balance, step = %self.step, "balance outside the dp grid");
        }
        bucket
    }
}

/// Keeps the `keep` best states by objective, then key.
fn truncate(layer: &mut Layer, keep: usize) {
    let mut ranked: Vec<(Objective, Key)> =
        layer.iter().map(|(key, node)| (node.objective, *key)).collect();
    ranked.sort_unstable();
    for (_, key) in ranked.drain(keep..) {
        layer.remove(&key);
    }
}

/// Walks parent pointers from the terminal state back to the root.
fn backtrack(model: &ConstraintModel, layers: &[Layer], terminal: Key) -> [ShiftCode; HORIZON] {
    let mut actions = [ShiftCode::O; HORIZON];
    for day in crate::models::all_days() {
        if let Some(code) = model.fixed(day) {
            actions[idx(day)] = code;
        }
    }

    let start_day = model.first_day();
    let mut key = terminal;
    for day in model.days().rev() {
        let layer = &layers[usize::from(day - start_day) + 1];
        let Some(node) = layer.get(&key) else { break };
        actions[idx(day)] = node.action;
        key = node.parent;
    }
    actions
}
