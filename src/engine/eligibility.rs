//! Activity eligibility: classifies a member's recorded sales metrics
//! against configured thresholds. Pure function, inclusive boundaries.

use crate::domain::{ActivityThresholds, Member};

/// Result of an eligibility evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityStatus {
    pub is_monthly_active: bool,
    pub is_annually_active: bool,
    pub has_initial_purchase: bool,
    /// Monthly AND annual AND initial purchase, all simultaneously.
    pub is_fully_active: bool,
}

impl ActivityStatus {
    /// Evaluate a member against the thresholds. All comparisons are `>=`:
    /// landing exactly on a threshold qualifies.
    pub fn evaluate(member: &Member, thresholds: &ActivityThresholds) -> Self {
        let is_monthly_active = member.monthly_sales >= thresholds.monthly_min;
        let is_annually_active = member.annual_sales >= thresholds.annual_min;
        let has_initial_purchase = member.total_investment >= thresholds.initial_purchase_min;
        ActivityStatus {
            is_monthly_active,
            is_annually_active,
            has_initial_purchase,
            is_fully_active: is_monthly_active && is_annually_active && has_initial_purchase,
        }
    }
}

/// Shorthand for the common gate in the monoline engine.
pub fn is_fully_active(member: &Member, thresholds: &ActivityThresholds) -> bool {
    ActivityStatus::evaluate(member, thresholds).is_fully_active
}
