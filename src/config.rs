//! Engine configuration.
//!
//! Everything that is not part of a single plan: the earning table, solver
//! budgets and the balance floor. Passed explicitly into the projector and
//! both solvers; nothing here is global.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::models::ShiftCode;
use crate::validation::{amount_in_range, too_large};

/// Net earning per shift code. `O` always earns zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarningTable {
    pub short: Decimal,
    pub medium: Decimal,
    pub long: Decimal,
    pub split_shift: Decimal,
}

impl Default for EarningTable {
    fn default() -> Self {
        Self {
            short: Decimal::from(75),
            medium: Decimal::from(100),
            long: Decimal::from(125),
            split_shift: Decimal::from(150),
        }
    }
}

impl EarningTable {
    /// Creates a table from the four work-code rates.
    pub fn new(short: Decimal, medium: Decimal, long: Decimal, split_shift: Decimal) -> Self {
        Self {
            short,
            medium,
            long,
            split_shift,
        }
    }

    /// Earning for a code.
    #[inline]
    pub fn rate(&self, code: ShiftCode) -> Decimal {
        match code {
            ShiftCode::O => Decimal::ZERO,
            ShiftCode::S => self.short,
            ShiftCode::M => self.medium,
            ShiftCode::L => self.long,
            ShiftCode::SS => self.split_shift,
        }
    }

    /// Highest single-day earning.
    pub fn max_rate(&self) -> Decimal {
        ShiftCode::ALL
            .iter()
            .map(|&c| self.rate(c))
            .max()
            .unwrap_or(Decimal::ZERO)
    }

    fn validate(&self) -> Result<()> {
        for code in ShiftCode::ALL {
            let rate = self.rate(code);
            if rate < Decimal::ZERO {
                return Err(EngineError::Config(format!(
                    "earning for {code} must be non-negative, got {rate}"
                )));
            }
            if !amount_in_range(rate) {
                return Err(EngineError::Config(format!(
                    "earning for {code}: {}",
                    too_large(rate)
                )));
            }
        }
        Ok(())
    }
}

/// Budget for the exact solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExactConfig {
    /// Maximum search nodes before giving up on an optimality proof.
    pub max_steps: u64,
    /// Optional wall-clock cap. Results under a time cap may differ
    /// between runs; the step budget alone is deterministic.
    pub time_limit_ms: Option<u64>,
}

impl Default for ExactConfig {
    fn default() -> Self {
        Self {
            max_steps: 2_000_000,
            time_limit_ms: None,
        }
    }
}

/// Grid and size limits for the DP solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DpConfig {
    /// Balance bucket width.
    pub resolution: Decimal,
    /// States kept per day; layers beyond this are truncated to the best.
    pub max_states_per_day: usize,
}

impl Default for DpConfig {
    fn default() -> Self {
        Self {
            resolution: Decimal::new(1, 2),
            max_states_per_day: 200_000,
        }
    }
}

/// Top-level engine configuration.
///
/// # Example
/// ```
/// use cashflow_schedule::config::EngineConfig;
///
/// let config = EngineConfig::from_toml_str(r#"
///     [earnings]
///     short = 80
///     split_shift = 160
///
///     [exact]
///     max_steps = 50000
/// "#).unwrap();
/// assert_eq!(config.exact.max_steps, 50_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub earnings: EarningTable,
    pub exact: ExactConfig,
    pub dp: DpConfig,
    /// Hard floor on every closing balance. `None` allows overdraft.
    pub min_balance: Option<Decimal>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            earnings: EarningTable::default(),
            exact: ExactConfig::default(),
            dp: DpConfig::default(),
            min_balance: Some(Decimal::ZERO),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the earning table.
    pub fn with_earnings(mut self, earnings: EarningTable) -> Self {
        self.earnings = earnings;
        self
    }

    /// Sets the exact solver step budget.
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.exact.max_steps = max_steps;
        self
    }

    /// Sets the balance floor.
    pub fn with_min_balance(mut self, min_balance: Option<Decimal>) -> Self {
        self.min_balance = min_balance;
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        self.earnings.validate()?;
        if let Some(floor) = self.min_balance.filter(|f| !amount_in_range(*f)) {
            return Err(EngineError::Config(format!("min_balance: {}", too_large(floor))));
        }
        if self.exact.max_steps == 0 {
            return Err(EngineError::Config("exact.max_steps must be positive".into()));
        }
        if self.dp.resolution <= Decimal::ZERO {
            return Err(EngineError::Config(format!(
                "dp.resolution must be positive, got {}",
                self.dp.resolution
            )));
        }
        if self.dp.max_states_per_day == 0 {
            return Err(EngineError::Config(
                "dp.max_states_per_day must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_rates() {
        let table = EarningTable::default();
        assert_eq!(table.rate(ShiftCode::O), dec!(0));
        assert_eq!(table.rate(ShiftCode::S), dec!(75));
        assert_eq!(table.rate(ShiftCode::SS), dec!(150));
        assert_eq!(table.max_rate(), dec!(150));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_balance, Some(dec!(0)));
        assert_eq!(config.dp.resolution, dec!(0.01));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EngineConfig::from_toml_str(
            r#"
            [earnings]
            long = 130

            [dp]
            max_states_per_day = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.earnings.long, dec!(130));
        assert_eq!(config.earnings.short, dec!(75));
        assert_eq!(config.dp.max_states_per_day, 1000);
        assert_eq!(config.exact.max_steps, 2_000_000);
    }

    #[test]
    fn test_negative_rate_rejected() {
        let config = EngineConfig::default()
            .with_earnings(EarningTable::new(dec!(-1), dec!(100), dec!(125), dec!(150)));
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_huge_rate_rejected() {
        let huge = dec!(79228162514264337593543950000);
        let config = EngineConfig::default()
            .with_earnings(EarningTable::new(dec!(75), dec!(100), dec!(125), huge));
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));

        let config = EngineConfig::default().with_min_balance(Some(-huge));
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = EngineConfig::from_toml_str("exact = 5").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let config = EngineConfig::default().with_max_steps(0);
        assert!(config.validate().is_err());
    }
}
