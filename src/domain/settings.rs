//! Commission structure and activity thresholds.
//!
//! Immutable configuration value types handed to the calculators on every
//! call. Validation happens once, at load time; the engines assume a
//! validated structure and never re-check percentages mid-calculation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Decimal;

/// Number of paid upline levels in both commission models.
pub const UPLINE_LEVELS: usize = 7;

fn d(s: &str) -> Decimal {
    // Literals below are all valid decimal strings.
    Decimal::from_str_canonical(s).expect("invalid decimal literal")
}

/// Currency-amount thresholds for activity classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityThresholds {
    /// Minimum lifetime investment counting as an initial purchase.
    pub initial_purchase_min: Decimal,
    /// Minimum monthly sales volume.
    pub monthly_min: Decimal,
    /// Minimum annual sales volume.
    pub annual_min: Decimal,
}

impl Default for ActivityThresholds {
    fn default() -> Self {
        ActivityThresholds {
            initial_purchase_min: d("100"),
            monthly_min: d("20"),
            annual_min: d("200"),
        }
    }
}

/// Full commission configuration for both models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionStructure {
    // Classic percentage model
    /// Direct sponsor share of the investment amount, in percent.
    pub sponsor_rate: Decimal,
    /// Share of the investment pre-allocated to the career depth pool.
    pub career_pool_rate: Decimal,
    /// Per-level shares of the career pool, level 1 first.
    pub career_level_rates: Vec<Decimal>,
    /// Share of the investment paid to the root member.
    pub system_fund_rate: Decimal,
    /// Passive rate per career level (index = career level).
    pub passive_rates_by_career_level: Vec<Decimal>,
    /// Binary network bonus rate applied to the weaker leg volume.
    pub binary_rate: Decimal,

    // Monoline fixed-amount model
    /// Fixed per-unit product price the monoline split must sum to.
    pub unit_price: Decimal,
    pub direct_sponsor_amount: Decimal,
    /// Fixed upline amounts, level 1 first.
    pub level_amounts: Vec<Decimal>,
    pub passive_pool_amount: Decimal,
    pub company_fund_amount: Decimal,

    pub thresholds: ActivityThresholds,
}

impl Default for CommissionStructure {
    fn default() -> Self {
        CommissionStructure {
            sponsor_rate: d("10"),
            career_pool_rate: d("25"),
            career_level_rates: vec![
                d("8"),
                d("6"),
                d("5"),
                d("3"),
                d("2"),
                d("1.5"),
                d("0.5"),
            ],
            system_fund_rate: d("60"),
            passive_rates_by_career_level: vec![
                d("0"),
                d("0.5"),
                d("1"),
                d("1.5"),
                d("2"),
                d("2.5"),
            ],
            binary_rate: d("10"),
            unit_price: d("20.00"),
            direct_sponsor_amount: d("3.00"),
            level_amounts: vec![
                d("3.50"),
                d("1.50"),
                d("1.00"),
                d("0.70"),
                d("0.50"),
                d("0.40"),
                d("0.30"),
            ], // sums to 7.90 so the monoline split closes at 20.00
            passive_pool_amount: d("0.10"),
            company_fund_amount: d("9.00"),
            thresholds: ActivityThresholds::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructureError {
    #[error("unit price must be positive, got {0}")]
    NonPositiveUnitPrice(Decimal),
    #[error("expected {expected} upline levels, got {got}")]
    WrongLevelCount { expected: usize, got: usize },
    #[error("monoline parts sum to {got}, unit price is {expected}")]
    MonolineSumMismatch { expected: Decimal, got: Decimal },
    #[error("classic rates allocate {0}% which exceeds 100%")]
    ClassicOverAllocation(Decimal),
    #[error("negative rate or amount: {0}")]
    NegativeValue(Decimal),
}

impl CommissionStructure {
    /// Validate the structure once at load.
    ///
    /// The calculators rely on this having passed; in particular the
    /// monoline exact-sum invariant is only as good as this check.
    pub fn validate(&self) -> Result<(), StructureError> {
        if !self.unit_price.is_positive() {
            return Err(StructureError::NonPositiveUnitPrice(self.unit_price));
        }
        for amounts in [&self.career_level_rates, &self.level_amounts] {
            if amounts.len() != UPLINE_LEVELS {
                return Err(StructureError::WrongLevelCount {
                    expected: UPLINE_LEVELS,
                    got: amounts.len(),
                });
            }
        }
        for v in self
            .career_level_rates
            .iter()
            .chain(self.level_amounts.iter())
            .chain(self.passive_rates_by_career_level.iter())
            .chain([
                &self.sponsor_rate,
                &self.career_pool_rate,
                &self.system_fund_rate,
                &self.binary_rate,
                &self.direct_sponsor_amount,
                &self.passive_pool_amount,
                &self.company_fund_amount,
            ])
        {
            if v.is_negative() {
                return Err(StructureError::NegativeValue(*v));
            }
        }

        let mut monoline_sum = self.direct_sponsor_amount;
        for a in &self.level_amounts {
            monoline_sum += *a;
        }
        monoline_sum += self.passive_pool_amount;
        monoline_sum += self.company_fund_amount;
        if monoline_sum != self.unit_price {
            return Err(StructureError::MonolineSumMismatch {
                expected: self.unit_price,
                got: monoline_sum,
            });
        }

        let classic_sum = self.sponsor_rate + self.career_pool_rate + self.system_fund_rate;
        if classic_sum > Decimal::hundred() {
            return Err(StructureError::ClassicOverAllocation(classic_sum));
        }

        Ok(())
    }

    /// Passive rate for a career level; levels beyond the table earn the
    /// top configured rate.
    pub fn passive_rate(&self, career_level: u8) -> Decimal {
        let idx = (career_level as usize).min(self.passive_rates_by_career_level.len().saturating_sub(1));
        self.passive_rates_by_career_level
            .get(idx)
            .copied()
            .unwrap_or_else(Decimal::zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_structure_is_valid() {
        CommissionStructure::default().validate().expect("default must validate");
    }

    #[test]
    fn test_default_monoline_parts_sum_to_unit_price() {
        let s = CommissionStructure::default();
        let mut sum = s.direct_sponsor_amount + s.passive_pool_amount + s.company_fund_amount;
        for a in &s.level_amounts {
            sum += *a;
        }
        assert_eq!(sum, s.unit_price);
    }

    #[test]
    fn test_monoline_sum_mismatch_rejected() {
        let mut s = CommissionStructure::default();
        s.company_fund_amount = d("9.01");
        assert!(matches!(
            s.validate(),
            Err(StructureError::MonolineSumMismatch { .. })
        ));
    }

    #[test]
    fn test_non_positive_unit_price_rejected() {
        let mut s = CommissionStructure::default();
        s.unit_price = Decimal::zero();
        assert!(matches!(
            s.validate(),
            Err(StructureError::NonPositiveUnitPrice(_))
        ));
    }

    #[test]
    fn test_wrong_level_count_rejected() {
        let mut s = CommissionStructure::default();
        s.level_amounts.pop();
        assert!(matches!(
            s.validate(),
            Err(StructureError::WrongLevelCount { expected: 7, got: 6 })
        ));
    }

    #[test]
    fn test_classic_over_allocation_rejected() {
        let mut s = CommissionStructure::default();
        s.system_fund_rate = d("90");
        assert!(matches!(
            s.validate(),
            Err(StructureError::ClassicOverAllocation(_))
        ));
    }

    #[test]
    fn test_passive_rate_clamps_to_top_level() {
        let s = CommissionStructure::default();
        assert_eq!(s.passive_rate(0), d("0"));
        assert_eq!(s.passive_rate(2), d("1"));
        assert_eq!(s.passive_rate(200), d("2.5"));
    }
}
