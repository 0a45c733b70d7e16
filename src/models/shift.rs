//! Shift code model.
//!
//! A shift code is the single action chosen for one day of the horizon.
//! The alphabet is closed: one rest code and four work codes. Earnings per
//! code are *not* defined here; they come from [`EarningTable`] so the
//! same models serve any pay configuration.
//!
//! [`EarningTable`]: crate::config::EarningTable

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One day's action.
///
/// The declaration order (`O < S < M < L < SS`) is the solvers' value
/// ordering and the final tie-break between otherwise equal schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShiftCode {
    /// Off (no work, zero earnings).
    O,
    /// Short shift.
    S,
    /// Medium shift.
    M,
    /// Long shift.
    L,
    /// Split shift.
    SS,
}

impl ShiftCode {
    /// All codes in enumeration order.
    pub const ALL: [ShiftCode; 5] = [
        ShiftCode::O,
        ShiftCode::S,
        ShiftCode::M,
        ShiftCode::L,
        ShiftCode::SS,
    ];

    /// Whether this code counts as a work day.
    #[inline]
    pub fn is_work(self) -> bool {
        self != ShiftCode::O
    }

    /// Canonical code string.
    pub fn as_str(self) -> &'static str {
        match self {
            ShiftCode::O => "O",
            ShiftCode::S => "S",
            ShiftCode::M => "M",
            ShiftCode::L => "L",
            ShiftCode::SS => "SS",
        }
    }
}

impl fmt::Display for ShiftCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unknown shift code string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown shift code '{0}' (expected O, S, M, L or SS)")]
pub struct UnknownShiftCode(pub String);

impl FromStr for ShiftCode {
    type Err = UnknownShiftCode;

    /// Parses a code, ignoring surrounding whitespace and case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "O" => Ok(ShiftCode::O),
            "S" => Ok(ShiftCode::S),
            "M" => Ok(ShiftCode::M),
            "L" => Ok(ShiftCode::L),
            "SS" => Ok(ShiftCode::SS),
            _ => Err(UnknownShiftCode(s.to_string())),
        }
    }
}
