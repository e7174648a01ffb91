//! Monoline fixed-amount commission engine.
//!
//! Every unit sale splits the fixed product price into exact cent amounts:
//! direct sponsor, seven eligibility-gated upline levels, a passive pool
//! contribution, and a company fund contribution. Amounts an upline level
//! cannot receive are forfeited into the company fund; nothing ever
//! vanishes. The exact-sum invariant (parts == unit price) is the primary
//! correctness property here.

use uuid::Uuid;

use crate::directory::MemberDirectory;
use crate::domain::{
    ActivityThresholds, CommissionCategory, CommissionStructure, CommissionTransaction, Decimal,
    Member, MemberId, TimeMs,
};

use super::eligibility::is_fully_active;
use super::CalculationError;

/// Output of one monoline sale calculation.
#[derive(Debug, Clone)]
pub struct MonolineOutcome {
    pub transactions: Vec<CommissionTransaction>,
    /// Fixed contribution earmarked for the passive income pool.
    pub passive_pool_amount: Decimal,
    /// Fixed company fund contribution plus every forfeited amount.
    pub company_fund_amount: Decimal,
    /// Sum of the paid (member-bound) transactions.
    pub total_distributed: Decimal,
    /// Subtotal of level amounts withheld from ineligible or missing
    /// upline members; already included in `company_fund_amount`.
    pub forfeited_to_company: Decimal,
}

/// Result of distributing an accumulated passive pool.
#[derive(Debug, Clone)]
pub enum PassivePoolOutcome {
    /// No fully-active members exist; explicit no-op, not an error.
    NoActiveMembers,
    Distributed {
        amount_per_member: Decimal,
        transactions: Vec<CommissionTransaction>,
        total_distributed: Decimal,
    },
}

/// Fixed-amount calculator.
#[derive(Debug, Clone, Default)]
pub struct MonolineEngine;

impl MonolineEngine {
    pub fn new() -> Self {
        MonolineEngine
    }

    /// Split one unit sale by `buyer_id` per the fixed structure.
    ///
    /// # Errors
    /// `CalculationError::BuyerNotFound` if the buyer is not in the snapshot.
    pub fn calculate(
        &self,
        directory: &MemberDirectory,
        buyer_id: MemberId,
        structure: &CommissionStructure,
        sale_id: Uuid,
        now: TimeMs,
    ) -> Result<MonolineOutcome, CalculationError> {
        let buyer = directory
            .get(buyer_id)
            .ok_or(CalculationError::BuyerNotFound(buyer_id))?;

        let mut transactions = Vec::new();
        let mut forfeited = Decimal::zero();

        // Direct sponsor bonus: paid whenever a sponsor exists, active or
        // not. An orphan buyer's sponsor amount falls to the company fund
        // so the split still sums to the unit price.
        match buyer.sponsor_id.and_then(|id| directory.get(id)) {
            Some(sponsor) => transactions.push(CommissionTransaction::new(
                sale_id,
                buyer_id,
                sponsor.id,
                CommissionCategory::Sponsor,
                None,
                structure.direct_sponsor_amount,
                now,
            )),
            None => forfeited += structure.direct_sponsor_amount,
        }

        // Seven fixed upline levels, each gated by full activity of the
        // recipient. The walk follows sponsor links level by level; a
        // missing link forfeits that level and everything above it.
        let mut upline = directory.upline(buyer_id);
        for (idx, level_amount) in structure.level_amounts.iter().enumerate() {
            match upline.next() {
                Some(recipient) if is_fully_active(recipient, &structure.thresholds) => {
                    transactions.push(CommissionTransaction::new(
                        sale_id,
                        buyer_id,
                        recipient.id,
                        CommissionCategory::Level(idx as u8 + 1),
                        None,
                        *level_amount,
                        now,
                    ));
                }
                _ => forfeited += *level_amount,
            }
        }

        let mut total_distributed = Decimal::zero();
        for tx in &transactions {
            total_distributed += tx.amount;
        }

        Ok(MonolineOutcome {
            transactions,
            passive_pool_amount: structure.passive_pool_amount,
            company_fund_amount: structure.company_fund_amount + forfeited,
            total_distributed,
            forfeited_to_company: forfeited,
        })
    }

    /// Evenly distribute an accumulated passive pool across every
    /// fully-active member. Scheduled operation, not per-sale.
    pub fn distribute_passive_pool(
        &self,
        directory: &MemberDirectory,
        total_pool: Decimal,
        thresholds: &ActivityThresholds,
        now: TimeMs,
    ) -> PassivePoolOutcome {
        let mut recipients: Vec<&Member> = directory
            .iter()
            .filter(|m| is_fully_active(m, thresholds))
            .collect();
        if recipients.is_empty() {
            return PassivePoolOutcome::NoActiveMembers;
        }
        recipients.sort_by_key(|m| m.id);

        // One rounding step for the per-member share; the sum may undershoot
        // the pool by at most half a cent per recipient.
        let amount_per_member =
            (total_pool / Decimal::from_count(recipients.len())).round_money();

        let distribution_id = Uuid::new_v4();
        let transactions: Vec<CommissionTransaction> = recipients
            .iter()
            .map(|m| {
                CommissionTransaction::new(
                    distribution_id,
                    m.id,
                    m.id,
                    CommissionCategory::Passive,
                    None,
                    amount_per_member,
                    now,
                )
            })
            .collect();

        let total_distributed =
            amount_per_member * Decimal::from_count(transactions.len());

        PassivePoolOutcome::Distributed {
            amount_per_member,
            transactions,
            total_distributed,
        }
    }
}
