//! Classic percentage commission engine.
//!
//! Splits an investment amount into sponsor bonus, depth-weighted career
//! bonuses, passive income, and the system fund. Pure over the directory
//! snapshot: outputs are pending transactions for the ledger applier.

use uuid::Uuid;

use crate::directory::MemberDirectory;
use crate::domain::{
    CommissionCategory, CommissionStructure, CommissionTransaction, Decimal, MemberId, TimeMs,
};

use super::CalculationError;

/// Output of one classic calculation pass.
#[derive(Debug, Clone)]
pub struct ClassicOutcome {
    pub transactions: Vec<CommissionTransaction>,
    pub total_allocated: Decimal,
}

/// Percentage-cascade calculator.
#[derive(Debug, Clone)]
pub struct ClassicEngine {
    root_member_id: MemberId,
}

impl ClassicEngine {
    pub fn new(root_member_id: MemberId) -> Self {
        ClassicEngine { root_member_id }
    }

    /// Split `amount` for a purchase by `buyer_id`.
    ///
    /// # Errors
    /// `CalculationError::BuyerNotFound` if the buyer is not in the snapshot.
    pub fn calculate(
        &self,
        directory: &MemberDirectory,
        buyer_id: MemberId,
        amount: Decimal,
        structure: &CommissionStructure,
        purchase_id: Uuid,
        now: TimeMs,
    ) -> Result<ClassicOutcome, CalculationError> {
        let buyer = directory
            .get(buyer_id)
            .ok_or(CalculationError::BuyerNotFound(buyer_id))?;

        let mut transactions = Vec::new();
        let mut push = |recipient: MemberId,
                        category: CommissionCategory,
                        rate: Decimal,
                        amount: Decimal,
                        transactions: &mut Vec<CommissionTransaction>| {
            let rounded = amount.round_money();
            if rounded.is_positive() {
                transactions.push(CommissionTransaction::new(
                    purchase_id,
                    buyer_id,
                    recipient,
                    category,
                    Some(rate),
                    rounded,
                    now,
                ));
            }
        };

        // Direct sponsor: paid only to an existing, active sponsor. An
        // inactive or missing sponsor is silently skipped; nothing is
        // forfeited elsewhere in this model.
        if let Some(sponsor) = buyer.sponsor_id.and_then(|id| directory.get(id)) {
            if sponsor.is_active {
                push(
                    sponsor.id,
                    CommissionCategory::Sponsor,
                    structure.sponsor_rate,
                    structure.sponsor_rate.percent_of(amount),
                    &mut transactions,
                );
            }
        }

        // Career depth bonus: each level's rate applies to the pre-allocated
        // pool. The ladder ends at the first missing link and at the first
        // inactive member; it does not recurse through inactive members.
        let pool = structure.career_pool_rate.percent_of(amount);
        let mut current = buyer;
        for (idx, rate) in structure.career_level_rates.iter().enumerate() {
            let sponsor = match current.sponsor_id.and_then(|id| directory.get(id)) {
                Some(s) => s,
                None => break,
            };
            if !sponsor.is_active {
                break;
            }
            push(
                sponsor.id,
                CommissionCategory::Level(idx as u8 + 1),
                *rate,
                rate.percent_of(pool),
                &mut transactions,
            );
            current = sponsor;
        }

        // Passive income: propagates through the full chain regardless of
        // whether a given sponsor earns anything at their career level.
        // This asymmetry with the depth bonus is intentional.
        let seven = Decimal::from_count(structure.career_level_rates.len());
        let mut current = buyer;
        for level in 1..=structure.career_level_rates.len() {
            let sponsor = match current.sponsor_id.and_then(|id| directory.get(id)) {
                Some(s) => s,
                None => break,
            };
            let levels_remaining = Decimal::from_count(
                structure.career_level_rates.len() - level + 1,
            );
            let rate = structure.passive_rate(sponsor.career_level);
            let effective = rate * levels_remaining / seven;
            push(
                sponsor.id,
                CommissionCategory::Passive,
                effective,
                effective.percent_of(amount),
                &mut transactions,
            );
            current = sponsor;
        }

        // System fund: always allocated to the configured root member. A
        // missing root is settled as a failed transaction by the ledger.
        push(
            self.root_member_id,
            CommissionCategory::CompanyFund,
            structure.system_fund_rate,
            structure.system_fund_rate.percent_of(amount),
            &mut transactions,
        );

        let mut total_allocated = Decimal::zero();
        for tx in &transactions {
            total_allocated += tx.amount;
        }

        Ok(ClassicOutcome {
            transactions,
            total_allocated,
        })
    }
}
