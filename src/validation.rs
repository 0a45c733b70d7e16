//! Plan validation and normalization.
//!
//! This is the trust boundary of the engine. Untyped payloads are parsed
//! into a [`Plan`] here, and typed plans built in code are re-checked here,
//! so nothing downstream has to reject malformed primitives. Detects:
//! - Missing or mistyped fields
//! - Non-finite or unparseable numbers
//! - Days outside `1..=30`
//! - Non-positive deposit/bill amounts and empty bill names
//! - Money values beyond [`MAX_AMOUNT`] in magnitude
//! - Inverted, overlapping or action-less locks
//!
//! Every problem found is reported in one pass, each tagged with the
//! offending field path (e.g. `bills[2].amount`). Unknown fields are
//! ignored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::models::{
    all_days, Adjustment, Bill, Day, Deposit, Lock, Plan, ShiftCode, HORIZON,
};

/// Largest magnitude accepted for any balance, amount, band or guard.
///
/// Keeps every 30-day running sum far inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Path of the offending field.
    pub field: String,
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// A required field is absent.
    MissingField,
    /// A field has the wrong JSON type.
    InvalidType,
    /// A numeric field is not a finite number.
    InvalidNumber,
    /// A day lies outside `1..=30`.
    DayOutOfRange,
    /// A deposit or bill amount is zero or negative.
    NonPositiveAmount,
    /// A money value exceeds [`MAX_AMOUNT`] in magnitude.
    AmountOutOfRange,
    /// The band is negative.
    NegativeBand,
    /// A bill name is blank.
    EmptyName,
    /// A lock has `start > end` or is not a day pair.
    InvalidLock,
    /// Two locks share a day.
    OverlappingLock,
    /// A locked day has no action to keep.
    LockWithoutAction,
    /// An action is not a known shift code.
    InvalidAction,
    /// `actions` does not have exactly 30 entries.
    WrongLength,
    /// A day that must carry a recorded action has none.
    MissingAction,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        kind: ValidationErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Parses an untyped payload into a normalized, validated plan.
///
/// Numbers may be JSON numbers or numeric strings. Collections come back
/// sorted canonically (see [`Plan::normalize`]).
///
/// # Example
/// ```
/// use cashflow_schedule::validation::parse_plan;
/// use serde_json::json;
///
/// let plan = parse_plan(&json!({
///     "start_balance": 90.5,
///     "target_end": "490.5",
///     "band": 25,
///     "bills": [{ "day": 30, "name": "Rent", "amount": 1636 }],
///     "locks": [[5, 10]],
///     "actions": [null, null, null, null, "O", "O", "O", "O", "O", "O",
///                 null, null, null, null, null, null, null, null, null, null,
///                 null, null, null, null, null, null, null, null, null, null],
/// })).unwrap();
/// assert_eq!(plan.bills.len(), 1);
/// ```
pub fn parse_plan(payload: &Value) -> Result<Plan, Vec<ValidationError>> {
    let Some(obj) = payload.as_object() else {
        return Err(vec![ValidationError::new(
            "$",
            ValidationErrorKind::InvalidType,
            "plan payload must be a JSON object",
        )]);
    };

    let mut p = PayloadParser::default();

    let start_balance = p.required_decimal(obj, "start_balance");
    let target_end = p.required_decimal(obj, "target_end");
    let band = p.optional_decimal(obj, "band").unwrap_or(Decimal::ZERO);
    let rent_guard = p.optional_decimal(obj, "rent_guard").unwrap_or(Decimal::ZERO);
    let guard_day = match obj.get("guard_day") {
        None | Some(Value::Null) => None,
        Some(v) => p.day(v, "guard_day"),
    };

    let deposits = p.entries(obj, "deposits", |p, item, field| {
        let day = p.field_day(item, field);
        let amount = p.field_decimal(item, field, "amount");
        Some(Deposit {
            day: day?,
            amount: amount?,
        })
    });

    let bills = p.entries(obj, "bills", |p, item, field| {
        let day = p.field_day(item, field);
        let name = p.field_string(item, field, "name");
        let amount = p.field_decimal(item, field, "amount");
        Some(Bill {
            day: day?,
            name: name?,
            amount: amount?,
        })
    });

    let manual_adjustments = p.entries(obj, "manual_adjustments", |p, item, field| {
        let day = p.field_day(item, field);
        let amount = p.field_decimal(item, field, "amount");
        let note = match item.get("note") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                p.push(
                    format!("{field}.note"),
                    ValidationErrorKind::InvalidType,
                    "note must be a string",
                );
                None
            }
        };
        Some(Adjustment {
            day: day?,
            amount: amount?,
            note,
        })
    });

    let locks = p.locks(obj);
    let actions = p.actions(obj);
    let metadata = p.metadata(obj);

    if !p.errors.is_empty() {
        return Err(p.errors);
    }

    // Every required value was recorded; a `None` here implies an error above.
    let (Some(start_balance), Some(target_end)) = (start_balance, target_end) else {
        return Err(p.errors);
    };

    let mut plan = Plan {
        start_balance,
        target_end,
        band,
        rent_guard,
        guard_day,
        deposits,
        bills,
        actions,
        manual_adjustments,
        locks,
        metadata,
    };
    plan.normalize();
    validate_plan(&plan)?;
    Ok(plan)
}

/// Validates the invariants of a typed plan.
///
/// Checks:
/// 1. Band is non-negative and every money value is within [`MAX_AMOUNT`]
/// 2. Every day (flows, guard day, locks) lies in `1..=30`
/// 3. Deposit and bill amounts are positive
/// 4. Bill names are non-empty after trimming
/// 5. Locks satisfy `start <= end`, do not overlap, and every locked day
///    already carries an action
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_plan(plan: &Plan) -> ValidationResult {
    let mut errors = Vec::new();
    let mut push = |field: String, kind: ValidationErrorKind, message: String| {
        errors.push(ValidationError::new(field, kind, message));
    };

    for (field, value) in [
        ("start_balance", plan.start_balance),
        ("target_end", plan.target_end),
        ("band", plan.band),
        ("rent_guard", plan.rent_guard),
    ] {
        if !amount_in_range(value) {
            push(field.into(), ValidationErrorKind::AmountOutOfRange, too_large(value));
        }
    }

    if plan.band < Decimal::ZERO {
        push(
            "band".into(),
            ValidationErrorKind::NegativeBand,
            format!("band must be non-negative, got {}", plan.band),
        );
    }

    if let Some(day) = plan.guard_day {
        if !day_in_range(day) {
            push("guard_day".into(), ValidationErrorKind::DayOutOfRange, out_of_range(day));
        }
    }

    for (i, d) in plan.deposits.iter().enumerate() {
        if !day_in_range(d.day) {
            push(format!("deposits[{i}].day"), ValidationErrorKind::DayOutOfRange, out_of_range(d.day));
        }
        if d.amount <= Decimal::ZERO {
            push(
                format!("deposits[{i}].amount"),
                ValidationErrorKind::NonPositiveAmount,
                format!("deposit amount must be positive, got {}", d.amount),
            );
        } else if !amount_in_range(d.amount) {
            push(
                format!("deposits[{i}].amount"),
                ValidationErrorKind::AmountOutOfRange,
                too_large(d.amount),
            );
        }
    }

    for (i, b) in plan.bills.iter().enumerate() {
        if !day_in_range(b.day) {
            push(format!("bills[{i}].day"), ValidationErrorKind::DayOutOfRange, out_of_range(b.day));
        }
        if b.name.trim().is_empty() {
            push(
                format!("bills[{i}].name"),
                ValidationErrorKind::EmptyName,
                "bill name must not be empty".into(),
            );
        }
        if b.amount <= Decimal::ZERO {
            push(
                format!("bills[{i}].amount"),
                ValidationErrorKind::NonPositiveAmount,
                format!("bill amount must be positive, got {}", b.amount),
            );
        } else if !amount_in_range(b.amount) {
            push(
                format!("bills[{i}].amount"),
                ValidationErrorKind::AmountOutOfRange,
                too_large(b.amount),
            );
        }
    }

    for (i, a) in plan.manual_adjustments.iter().enumerate() {
        if !day_in_range(a.day) {
            push(
                format!("manual_adjustments[{i}].day"),
                ValidationErrorKind::DayOutOfRange,
                out_of_range(a.day),
            );
        }
        if !amount_in_range(a.amount) {
            push(
                format!("manual_adjustments[{i}].amount"),
                ValidationErrorKind::AmountOutOfRange,
                too_large(a.amount),
            );
        }
    }

    for (i, lock) in plan.locks.iter().enumerate() {
        let field = format!("locks[{i}]");
        if !day_in_range(lock.start) || !day_in_range(lock.end) {
            push(
                field,
                ValidationErrorKind::DayOutOfRange,
                format!("lock [{}, {}] must lie within 1..=30", lock.start, lock.end),
            );
            continue;
        }
        if lock.start > lock.end {
            push(
                field,
                ValidationErrorKind::InvalidLock,
                format!("lock start {} is after end {}", lock.start, lock.end),
            );
            continue;
        }
        if let Some((j, other)) = plan
            .locks
            .iter()
            .enumerate()
            .take(i)
            .find(|(_, other)| other.start <= other.end && lock.overlaps(other))
        {
            push(
                field.clone(),
                ValidationErrorKind::OverlappingLock,
                format!(
                    "lock [{}, {}] overlaps locks[{j}] [{}, {}]",
                    lock.start, lock.end, other.start, other.end
                ),
            );
        }
        for day in lock.start..=lock.end {
            if plan.action(day).is_none() {
                push(
                    format!("actions[{}]", day - 1),
                    ValidationErrorKind::LockWithoutAction,
                    format!("day {day} is locked by {field} but has no action"),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks that days `1..=through_day` all carry recorded actions.
pub fn require_recorded_actions(plan: &Plan, through_day: Day) -> ValidationResult {
    let errors: Vec<ValidationError> = all_days()
        .take_while(|&d| d <= through_day)
        .filter(|&d| plan.action(d).is_none())
        .map(|d| {
            ValidationError::new(
                format!("actions[{}]", d - 1),
                ValidationErrorKind::MissingAction,
                format!("day {d} has no recorded action to freeze"),
            )
        })
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[inline]
fn day_in_range(day: Day) -> bool {
    (1..=HORIZON as Day).contains(&day)
}

/// Whether a money value lies within `-MAX_AMOUNT..=MAX_AMOUNT`.
#[inline]
pub(crate) fn amount_in_range(value: Decimal) -> bool {
    value.abs() <= MAX_AMOUNT
}

pub(crate) fn too_large(value: Decimal) -> String {
    format!("{value} exceeds the largest accepted magnitude {MAX_AMOUNT}")
}

fn out_of_range(day: impl std::fmt::Display) -> String {
    format!("day {day} is outside 1..=30")
}

/// Parses a decimal from a JSON number or numeric string.
pub(crate) fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

#[derive(Default)]
struct PayloadParser {
    errors: Vec<ValidationError>,
}

impl PayloadParser {
    fn push(&mut self, field: impl Into<String>, kind: ValidationErrorKind, message: impl Into<String>) {
        self.errors.push(ValidationError::new(field, kind, message));
    }

    fn decimal(&mut self, value: &Value, field: &str) -> Option<Decimal> {
        match value {
            Value::Number(_) | Value::String(_) => {
                let parsed = parse_decimal(value);
                if parsed.is_none() {
                    self.push(
                        field,
                        ValidationErrorKind::InvalidNumber,
                        format!("{value} is not a finite number"),
                    );
                }
                parsed
            }
            _ => {
                self.push(field, ValidationErrorKind::InvalidType, "expected a number");
                None
            }
        }
    }

    fn required_decimal(&mut self, obj: &Map<String, Value>, key: &str) -> Option<Decimal> {
        match obj.get(key) {
            None | Some(Value::Null) => {
                self.push(key, ValidationErrorKind::MissingField, format!("{key} is required"));
                None
            }
            Some(v) => self.decimal(v, key),
        }
    }

    fn optional_decimal(&mut self, obj: &Map<String, Value>, key: &str) -> Option<Decimal> {
        match obj.get(key) {
            None | Some(Value::Null) => None,
            Some(v) => self.decimal(v, key),
        }
    }

    fn day(&mut self, value: &Value, field: &str) -> Option<Day> {
        let Some(n) = value.as_i64() else {
            self.push(field, ValidationErrorKind::InvalidType, format!("day must be an integer, got {value}"));
            return None;
        };
        match Day::try_from(n) {
            Ok(day) if day_in_range(day) => Some(day),
            _ => {
                self.push(field, ValidationErrorKind::DayOutOfRange, out_of_range(n));
                None
            }
        }
    }

    fn field_day(&mut self, item: &Map<String, Value>, field: &str) -> Option<Day> {
        match item.get("day") {
            None | Some(Value::Null) => {
                self.push(format!("{field}.day"), ValidationErrorKind::MissingField, "day is required");
                None
            }
            Some(v) => self.day(v, &format!("{field}.day")),
        }
    }

    fn field_decimal(&mut self, item: &Map<String, Value>, field: &str, key: &str) -> Option<Decimal> {
        let path = format!("{field}.{key}");
        match item.get(key) {
            None | Some(Value::Null) => {
                self.push(path, ValidationErrorKind::MissingField, format!("{key} is required"));
                None
            }
            Some(v) => self.decimal(v, &path),
        }
    }

    fn field_string(&mut self, item: &Map<String, Value>, field: &str, key: &str) -> Option<String> {
        let path = format!("{field}.{key}");
        match item.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::String(_)) => {
                self.push(path, ValidationErrorKind::EmptyName, format!("{key} must not be empty"));
                None
            }
            None | Some(Value::Null) => {
                self.push(path, ValidationErrorKind::MissingField, format!("{key} is required"));
                None
            }
            Some(_) => {
                self.push(path, ValidationErrorKind::InvalidType, format!("{key} must be a string"));
                None
            }
        }
    }

    /// Parses an optional array of objects with `parse_item`.
    fn entries<T>(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        parse_item: impl Fn(&mut Self, &Map<String, Value>, &str) -> Option<T>,
    ) -> Vec<T> {
        let items = match obj.get(key) {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.push(key, ValidationErrorKind::InvalidType, format!("{key} must be an array"));
                return Vec::new();
            }
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let field = format!("{key}[{i}]");
            match item.as_object() {
                Some(map) => {
                    if let Some(entry) = parse_item(self, map, &field) {
                        out.push(entry);
                    }
                }
                None => self.push(field, ValidationErrorKind::InvalidType, "expected an object"),
            }
        }
        out
    }

    fn locks(&mut self, obj: &Map<String, Value>) -> Vec<Lock> {
        let items = match obj.get("locks") {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.push("locks", ValidationErrorKind::InvalidType, "locks must be an array");
                return Vec::new();
            }
        };
        let mut locks = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let field = format!("locks[{i}]");
            let (start, end) = match item {
                Value::Array(pair) if pair.len() == 2 => (&pair[0], &pair[1]),
                Value::Object(map) => match (map.get("start"), map.get("end")) {
                    (Some(s), Some(e)) => (s, e),
                    _ => {
                        self.push(field, ValidationErrorKind::InvalidLock, "lock object needs start and end");
                        continue;
                    }
                },
                _ => {
                    self.push(field, ValidationErrorKind::InvalidLock, "lock must be a [start, end] pair");
                    continue;
                }
            };
            let start = self.day(start, &format!("{field}.start"));
            let end = self.day(end, &format!("{field}.end"));
            if let (Some(start), Some(end)) = (start, end) {
                locks.push(Lock::new(start, end));
            }
        }
        locks
    }

    fn actions(&mut self, obj: &Map<String, Value>) -> [Option<ShiftCode>; HORIZON] {
        let mut actions = [None; HORIZON];
        let items = match obj.get("actions") {
            None | Some(Value::Null) => return actions,
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.push("actions", ValidationErrorKind::InvalidType, "actions must be an array");
                return actions;
            }
        };
        if items.len() != HORIZON {
            self.push(
                "actions",
                ValidationErrorKind::WrongLength,
                format!("actions must have exactly {HORIZON} entries, got {}", items.len()),
            );
            return actions;
        }
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::Null => {}
                Value::String(s) => match s.parse::<ShiftCode>() {
                    Ok(code) => actions[i] = Some(code),
                    Err(e) => self.push(format!("actions[{i}]"), ValidationErrorKind::InvalidAction, e.to_string()),
                },
                other => self.push(
                    format!("actions[{i}]"),
                    ValidationErrorKind::InvalidAction,
                    format!("expected a shift code or null, got {other}"),
                ),
            }
        }
        actions
    }

    fn metadata(&mut self, obj: &Map<String, Value>) -> std::collections::BTreeMap<String, String> {
        let mut metadata = std::collections::BTreeMap::new();
        match obj.get("metadata") {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => {
                for (k, v) in map {
                    match v {
                        Value::String(s) => {
                            metadata.insert(k.clone(), s.clone());
                        }
                        _ => self.push(
                            format!("metadata.{k}"),
                            ValidationErrorKind::InvalidType,
                            "metadata values must be strings",
                        ),
                    }
                }
            }
            Some(_) => self.push("metadata", ValidationErrorKind::InvalidType, "metadata must be an object"),
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn base_payload() -> Value {
        json!({
            "start_balance": 90.5,
            "target_end": 490.5,
            "band": 25,
            "rent_guard": 1636,
            "deposits": [{ "day": 11, "amount": 1021 }],
            "bills": [{ "day": 30, "name": "Rent", "amount": 1636 }],
        })
    }

    fn kinds(errors: &[ValidationError]) -> Vec<ValidationErrorKind> {
        errors.iter().map(|e| e.kind.clone()).collect()
    }

    #[test]
    fn test_valid_payload() {
        let plan = parse_plan(&base_payload()).unwrap();
        assert_eq!(plan.start_balance, dec!(90.5));
        assert_eq!(plan.target_end, dec!(490.5));
        assert_eq!(plan.band, dec!(25));
        assert_eq!(plan.rent_guard, dec!(1636));
        assert_eq!(plan.deposits, vec![Deposit { day: 11, amount: dec!(1021) }]);
        assert_eq!(plan.bills[0].name, "Rent");
        assert!(plan.actions.iter().all(Option::is_none));
        assert!(plan.locks.is_empty());
    }

    #[test]
    fn test_numeric_strings_and_unknown_fields() {
        let mut payload = base_payload();
        payload["start_balance"] = json!(" 12.34 ");
        payload["band"] = json!("1e1");
        payload["color"] = json!("blue");
        let plan = parse_plan(&payload).unwrap();
        assert_eq!(plan.start_balance, dec!(12.34));
        assert_eq!(plan.band, dec!(10));
    }

    #[test]
    fn test_non_finite_number_rejected() {
        let mut payload = base_payload();
        payload["target_end"] = json!("NaN");
        payload["rent_guard"] = json!("inf");
        let errors = parse_plan(&payload).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.kind == ValidationErrorKind::InvalidNumber));
        assert!(errors.iter().any(|e| e.field == "target_end"));
    }

    #[test]
    fn test_missing_required_field() {
        let errors = parse_plan(&json!({ "target_end": 10 })).unwrap_err();
        assert_eq!(errors[0].field, "start_balance");
        assert_eq!(errors[0].kind, ValidationErrorKind::MissingField);
    }

    #[test]
    fn test_day_out_of_range() {
        let mut payload = base_payload();
        payload["deposits"] = json!([{ "day": 31, "amount": 5 }, { "day": 0, "amount": 5 }]);
        let errors = parse_plan(&payload).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::DayOutOfRange; 2]);
        assert_eq!(errors[0].field, "deposits[0].day");
        assert_eq!(errors[1].field, "deposits[1].day");
    }

    #[test]
    fn test_fractional_day_rejected() {
        let mut payload = base_payload();
        payload["bills"] = json!([{ "day": 2.5, "name": "x", "amount": 5 }]);
        let errors = parse_plan(&payload).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidType);
    }

    #[test]
    fn test_empty_bill_name() {
        let mut payload = base_payload();
        payload["bills"] = json!([{ "day": 3, "name": "   ", "amount": 5 }]);
        let errors = parse_plan(&payload).unwrap_err();
        assert_eq!(errors[0].field, "bills[0].name");
        assert_eq!(errors[0].kind, ValidationErrorKind::EmptyName);
    }

    #[test]
    fn test_bill_name_kept_verbatim() {
        let mut payload = base_payload();
        payload["bills"] = json!([{ "day": 30, "name": "  Rent ", "amount": 1636 }]);
        let plan = parse_plan(&payload).unwrap();
        assert_eq!(plan.bills[0].name, "  Rent ");
    }

    #[test]
    fn test_amounts_beyond_limit_rejected() {
        let mut payload = base_payload();
        payload["start_balance"] = json!("79228162514264337593543950000");
        payload["bills"] = json!([{ "day": 30, "name": "Rent", "amount": "1000000000000001" }]);
        payload["manual_adjustments"] = json!([{ "day": 2, "amount": "-1e16" }]);
        let errors = parse_plan(&payload).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::AmountOutOfRange; 3]);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["start_balance", "bills[0].amount", "manual_adjustments[0].amount"]);

        let at_limit = Plan::new(MAX_AMOUNT, -MAX_AMOUNT, dec!(0));
        assert!(validate_plan(&at_limit).is_ok());
    }

    #[test]
    fn test_non_positive_amounts() {
        let mut payload = base_payload();
        payload["deposits"] = json!([{ "day": 3, "amount": 0 }]);
        payload["bills"] = json!([{ "day": 3, "name": "x", "amount": -4 }]);
        let errors = parse_plan(&payload).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::NonPositiveAmount; 2]);
    }

    #[test]
    fn test_negative_adjustment_allowed() {
        let mut payload = base_payload();
        payload["manual_adjustments"] = json!([{ "day": 4, "amount": -20.25, "note": "fee" }]);
        let plan = parse_plan(&payload).unwrap();
        assert_eq!(plan.manual_adjustments[0].amount, dec!(-20.25));
        assert_eq!(plan.manual_adjustments[0].note.as_deref(), Some("fee"));
    }

    #[test]
    fn test_lock_forms_and_actions() {
        let mut payload = base_payload();
        let mut actions = vec![Value::Null; 30];
        for slot in actions.iter_mut().take(10).skip(4) {
            *slot = json!("o");
        }
        actions[20] = json!("SS");
        payload["actions"] = Value::Array(actions);
        payload["locks"] = json!([{ "start": 21, "end": 21 }, [5, 10]]);
        let plan = parse_plan(&payload).unwrap();
        assert_eq!(plan.locks, vec![Lock::new(5, 10), Lock::new(21, 21)]);
        assert_eq!(plan.action(5), Some(ShiftCode::O));
        assert_eq!(plan.action(21), Some(ShiftCode::SS));
    }

    #[test]
    fn test_inverted_lock() {
        let mut payload = base_payload();
        payload["locks"] = json!([[10, 5]]);
        let errors = parse_plan(&payload).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidLock);
    }

    #[test]
    fn test_overlapping_locks() {
        let mut payload = base_payload();
        payload["actions"] = json!(vec!["M"; 30]);
        payload["locks"] = json!([[1, 5], [5, 8]]);
        let errors = parse_plan(&payload).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::OverlappingLock]);
    }

    #[test]
    fn test_lock_without_action() {
        let mut payload = base_payload();
        payload["locks"] = json!([[3, 4]]);
        let errors = parse_plan(&payload).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::LockWithoutAction; 2]);
        assert_eq!(errors[0].field, "actions[2]");
    }

    #[test]
    fn test_actions_wrong_length_and_bad_code() {
        let mut payload = base_payload();
        payload["actions"] = json!(["O", "S"]);
        let errors = parse_plan(&payload).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::WrongLength);

        let mut actions = vec![Value::Null; 30];
        actions[0] = json!("XL");
        actions[1] = json!(3);
        payload["actions"] = Value::Array(actions);
        let errors = parse_plan(&payload).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::InvalidAction; 2]);
    }

    #[test]
    fn test_metadata_passthrough() {
        let mut payload = base_payload();
        payload["metadata"] = json!({ "owner": "sam", "month": "2024-05" });
        let plan = parse_plan(&payload).unwrap();
        assert_eq!(plan.metadata["owner"], "sam");

        payload["metadata"] = json!({ "owner": 7 });
        let errors = parse_plan(&payload).unwrap_err();
        assert_eq!(errors[0].field, "metadata.owner");
    }

    #[test]
    fn test_canonical_order() {
        let mut payload = base_payload();
        payload["bills"] = json!([
            { "day": 30, "name": "Rent", "amount": 1636 },
            { "day": 2, "name": "Water", "amount": 30 },
            { "day": 2, "name": "Gas", "amount": 30 },
        ]);
        payload["deposits"] = json!([{ "day": 20, "amount": 1 }, { "day": 11, "amount": 2 }]);
        let plan = parse_plan(&payload).unwrap();
        let names: Vec<&str> = plan.bills.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Gas", "Water", "Rent"]);
        assert_eq!(plan.deposits[0].day, 11);
    }

    #[test]
    fn test_multiple_errors_collected() {
        let errors = parse_plan(&json!({
            "start_balance": "abc",
            "target_end": 1,
            "band": -3,
            "bills": [{ "day": 40, "name": "", "amount": 1 }],
        }))
        .unwrap_err();
        assert!(errors.len() >= 3);
    }

    #[test]
    fn test_negative_band_rejected() {
        let mut payload = base_payload();
        payload["band"] = json!(-1);
        let errors = parse_plan(&payload).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::NegativeBand]);
    }

    #[test]
    fn test_non_object_payload() {
        let errors = parse_plan(&json!([1, 2])).unwrap_err();
        assert_eq!(errors[0].field, "$");
    }

    #[test]
    fn test_validate_typed_plan() {
        let plan = Plan::new(dec!(0), dec!(0), dec!(0))
            .with_deposit(31, dec!(10))
            .with_lock(3, 4);
        let errors = validate_plan(&plan).unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::DayOutOfRange));
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::LockWithoutAction));
    }

    #[test]
    fn test_require_recorded_actions() {
        let plan = Plan::new(dec!(0), dec!(0), dec!(0)).with_actions(1, 3, ShiftCode::M);
        assert!(require_recorded_actions(&plan, 3).is_ok());
        let errors = require_recorded_actions(&plan, 5).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, ValidationErrorKind::MissingAction);
        assert_eq!(errors[0].field, "actions[3]");
    }
}
