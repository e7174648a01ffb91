//! Lossless decimal money type backed by rust_decimal.
//!
//! Commission math must never drift: every split is computed exactly and
//! rounded once, at transaction-creation time, to the currency's minor-unit
//! precision.

use rust_decimal::{Decimal as RustDecimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minor-unit precision for wallet amounts (cents).
pub const MONEY_DP: u32 = 2;

/// Lossless decimal numeric type for commission calculations.
///
/// Backed by rust_decimal to avoid floating-point drift.
/// Serializes to JSON number (not string) by default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    /// Create a Decimal from a RustDecimal.
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// Get the underlying RustDecimal.
    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Returns the value 100.
    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    /// Build a Decimal from an integer count (team sizes, depths).
    pub fn from_count(n: usize) -> Self {
        Decimal(RustDecimal::from(n as i64))
    }

    /// Round to wallet precision, midpoint away from zero.
    ///
    /// Applied exactly once per transaction amount; intermediate split math
    /// stays unrounded so the exact-sum invariant cannot drift.
    pub fn round_money(&self) -> Self {
        Decimal(
            self.0
                .round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Interpret `self` as a percentage of `amount` (self = 10 means 10%).
    pub fn percent_of(&self, amount: Decimal) -> Decimal {
        Decimal(amount.0 * self.0 / RustDecimal::ONE_HUNDRED)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

// Arithmetic operations
impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_decimal_parse_roundtrip() {
        let test_cases = vec!["123.456", "0.0001", "1000000", "-123.456", "0", "20.00"];

        for s in test_cases {
            let decimal = Decimal::from_str_canonical(s).expect("parse failed");
            let formatted = decimal.to_canonical_string();
            let reparsed = Decimal::from_str_canonical(&formatted).expect("reparse failed");
            assert_eq!(decimal, reparsed, "roundtrip failed for {}", s);
        }
    }

    #[test]
    fn test_decimal_canonical_no_exponent() {
        let decimal = d("123");
        let formatted = decimal.to_canonical_string();
        assert!(
            !formatted.contains('e'),
            "formatted string should not contain exponent"
        );
        assert_eq!(formatted, "123");
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(d("10").percent_of(d("1000")), d("100"));
        assert_eq!(d("60").percent_of(d("1000")), d("600"));
        assert_eq!(d("1.5").percent_of(d("250")), d("3.75"));
    }

    #[test]
    fn test_round_money_midpoint_away_from_zero() {
        assert_eq!(d("3.333333").round_money(), d("3.33"));
        assert_eq!(d("2.005").round_money(), d("2.01"));
        assert_eq!(d("-2.005").round_money(), d("-2.01"));
        assert_eq!(d("7.90").round_money(), d("7.9"));
    }

    #[test]
    fn test_decimal_arithmetic() {
        let a = d("10.5");
        let b = d("2.5");

        assert_eq!((a + b).to_canonical_string(), "13");
        assert_eq!((a - b).to_canonical_string(), "8");
        assert_eq!((a * b).to_canonical_string(), "26.25");
        assert_eq!((a / b).to_canonical_string(), "4.2");
    }

    #[test]
    fn test_add_assign_accumulates() {
        let mut total = Decimal::zero();
        for part in ["3.50", "1.50", "1.00", "0.70", "0.50", "0.40", "0.30"] {
            total += d(part);
        }
        assert_eq!(total, d("7.90"));
    }

    #[test]
    fn test_decimal_json_serialization() {
        let decimal = d("123.456");
        let json = serde_json::to_value(decimal).unwrap();
        // Should serialize as a JSON number, not a string
        assert!(json.is_number());
        assert_eq!(json.to_string(), "123.456");
    }

    #[test]
    fn test_from_count() {
        assert_eq!(Decimal::from_count(0), Decimal::zero());
        assert_eq!(Decimal::from_count(42), d("42"));
    }

    #[test]
    fn test_decimal_ordering() {
        assert!(d("19") < d("20"));
        assert!(d("20") >= d("20"));
    }
}
