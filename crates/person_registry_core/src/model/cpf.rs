//! CPF identifier validation.
//!
//! # Responsibility
//! - Normalize raw CPF input to its 11-digit canonical form.
//! - Verify both weighted check digits.
//!
//! # Invariants
//! - A `Cpf` value always holds exactly 11 ASCII digits that pass both checks.
//! - Validation ignores every non-digit character, so `123.456.789-09` and
//!   `12345678909` produce the same result.
//! - Sequences made of a single repeated digit are never valid.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Number of digits in a normalized CPF.
pub const CPF_LENGTH: usize = 11;

/// Reason a raw CPF string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpfError {
    /// Digit count after stripping punctuation is not 11.
    WrongLength(usize),
    /// All 11 digits are identical (e.g. `00000000000`).
    RepeatedDigits,
    /// Check digit at `position` (9 or 10) does not match the checksum.
    CheckDigitMismatch { position: usize },
}

impl Display for CpfError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongLength(len) => {
                write!(f, "expected {CPF_LENGTH} digits, got {len}")
            }
            Self::RepeatedDigits => write!(f, "all digits are identical"),
            Self::CheckDigitMismatch { position } => {
                write!(f, "check digit at position {position} does not match")
            }
        }
    }
}

impl Error for CpfError {}

/// Validates a raw CPF and returns its digits-only form.
///
/// Non-digit characters are stripped before any check runs.
///
/// # Errors
/// - `WrongLength` when the stripped input is not 11 digits.
/// - `RepeatedDigits` for degenerate all-same-digit sequences.
/// - `CheckDigitMismatch` when either check digit is wrong.
pub fn validate_cpf(raw: &str) -> Result<String, CpfError> {
    let digits: Vec<u32> = raw
        .chars()
        .filter(char::is_ascii_digit)
        .filter_map(|ch| ch.to_digit(10))
        .collect();
    if digits.len() != CPF_LENGTH {
        return Err(CpfError::WrongLength(digits.len()));
    }

    if digits.iter().all(|digit| *digit == digits[0]) {
        return Err(CpfError::RepeatedDigits);
    }

    if check_digit(&digits[..9]) != digits[9] {
        return Err(CpfError::CheckDigitMismatch { position: 9 });
    }
    if check_digit(&digits[..10]) != digits[10] {
        return Err(CpfError::CheckDigitMismatch { position: 10 });
    }

    Ok(digits
        .iter()
        .filter_map(|digit| char::from_digit(*digit, 10))
        .collect())
}

/// Returns whether `raw` is a valid CPF after punctuation is stripped.
pub fn is_valid_cpf(raw: &str) -> bool {
    validate_cpf(raw).is_ok()
}

// Weights run from `len + 1` down to 2; a remainder of 10 folds to 0.
fn check_digit(digits: &[u32]) -> u32 {
    let top_weight = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(index, digit)| digit * (top_weight - index as u32))
        .sum();
    match (sum * 10) % 11 {
        10 => 0,
        value => value,
    }
}

/// Validated, normalized CPF identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl Cpf {
    /// Parses raw input (punctuation allowed) into a validated CPF.
    pub fn parse(raw: &str) -> Result<Self, CpfError> {
        validate_cpf(raw).map(Self)
    }

    /// Digits-only storage form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display mask `XXX.XXX.XXX-XX`.
    pub fn formatted(&self) -> String {
        let digits = self.0.as_str();
        format!(
            "{}.{}.{}-{}",
            &digits[0..3],
            &digits[3..6],
            &digits[6..9],
            &digits[9..11]
        )
    }
}

impl Display for Cpf {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Cpf {
    type Error = CpfError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cpf> for String {
    fn from(value: Cpf) -> Self {
        value.0
    }
}
