//! Cash-flow shift planning for a 30-day horizon.
//!
//! Chooses one shift code per day so that the day-30 balance lands inside a
//! target band, no balance goes negative, the guard balance holds around the
//! largest bill, and locked days keep their pre-set actions, while working
//! as few days as possible and spreading work out.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Plan`, `ShiftCode`, `LedgerRow`,
//!   `ValidationCheck`, `ConstraintModel`
//! - **`validation`**: Payload parsing and plan integrity checks
//! - **`projection`**: The ledger projector, the only place balances are computed
//! - **`cp`**: Exact branch-and-bound solver (`"cpsat"`)
//! - **`dp`**: Layered dynamic-programming solver (`"dp"`)
//! - **`scheduler`**: Solver interface, KPIs and the [`Engine`] façade
//! - **`config`**: Earning table, solver budgets, balance floor
//! - **`error`**: [`EngineError`]
//!
//! # Architecture
//!
//! ```text
//! payload ─► validation ─► Plan ─► ConstraintModel + FlowTable ─► Solver
//!                                                                    │
//!        SolveResponse ◄── checklist ◄── projection ◄── actions ◄────┘
//! ```
//!
//! Both solvers step through days with the projector's arithmetic and are
//! checked against the same constraint model, so a schedule they return
//! always passes the validator.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"
//! - Bellman (1957), "Dynamic Programming"

pub mod config;
pub mod cp;
pub mod dp;
pub mod error;
pub mod models;
pub mod projection;
pub mod scheduler;
pub mod validation;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use scheduler::{Engine, SolveResponse, SolveStatus, SolverKind};
