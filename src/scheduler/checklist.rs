//! Validator checklist assembly.

use crate::models::{ConstraintModel, LedgerRow, SeedActions, ValidationCheck, HORIZON};

/// Reports how many days carry an action. Unassigned days are projected
/// as `O`, so a partial sequence still gets a full ledger.
pub fn assignment_check(seed: &SeedActions) -> ValidationCheck {
    let assigned = seed.iter().filter(|a| a.is_some()).count();
    let missing: Vec<String> = seed
        .iter()
        .zip(1u32..)
        .filter(|(a, _)| a.is_none())
        .map(|(_, day)| day.to_string())
        .collect();

    let detail = if missing.is_empty() {
        format!("{assigned} of {HORIZON} days assigned")
    } else {
        format!(
            "{assigned} of {HORIZON} days assigned; unassigned days {} projected as O",
            missing.join(", ")
        )
    };
    ValidationCheck::new("actions assigned", missing.is_empty(), detail)
}

/// Full ordered checklist: assignment first, then the model's checks
/// (band, floor, guard, locks).
pub fn checklist(
    model: &ConstraintModel,
    rows: &[LedgerRow],
    assignment: ValidationCheck,
) -> Vec<ValidationCheck> {
    let mut checks = Vec::with_capacity(5);
    checks.push(assignment);
    checks.extend(model.checks(rows));
    checks
}
