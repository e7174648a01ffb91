//! Distribution flows: run a calculator over a fresh snapshot, apply the
//! ledger, and persist wallets and transactions.
//!
//! Each flow follows the same shape: record the triggering event, claim it
//! (idempotency gate), load the member snapshot, run the pure engine, apply
//! wallets in memory, then persist. The claim happens before application,
//! so a concurrent duplicate request observes "already distributed" and
//! never double-credits.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{Repository, SaleRecord};
use crate::directory::MemberDirectory;
use crate::domain::{
    CommissionCategory, CommissionStructure, CommissionTransaction, Decimal, Member, MemberId,
    TimeMs,
};
use crate::engine::{
    CalculationError, ClassicEngine, LedgerApplier, LedgerReport, MonolineEngine,
    PassivePoolOutcome, TreeStatsEngine,
};

#[derive(Clone)]
pub struct Distributor {
    repo: Arc<Repository>,
    classic: ClassicEngine,
    monoline: MonolineEngine,
    ledger: LedgerApplier,
    stats: TreeStatsEngine,
    structure: CommissionStructure,
    root_member_id: MemberId,
}

/// Result of one monoline sale distribution.
#[derive(Debug)]
pub struct MonolineDistribution {
    pub sale_id: Uuid,
    pub transactions: Vec<CommissionTransaction>,
    pub passive_pool_amount: Decimal,
    pub company_fund_amount: Decimal,
    pub total_distributed: Decimal,
    pub forfeited_to_company: Decimal,
    pub ledger: LedgerReport,
}

/// Result of one classic purchase distribution.
#[derive(Debug)]
pub struct ClassicDistribution {
    pub purchase_id: Uuid,
    pub transactions: Vec<CommissionTransaction>,
    pub total_allocated: Decimal,
    pub ledger: LedgerReport,
}

/// Result of a scheduled passive pool distribution.
#[derive(Debug)]
pub struct PassiveDistribution {
    pub amount_per_member: Decimal,
    pub recipient_count: usize,
    pub total_distributed: Decimal,
    pub transactions: Vec<CommissionTransaction>,
    pub ledger: LedgerReport,
}

/// Read-only binary network summary for dashboards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryNetworkStats {
    pub left_volume: Decimal,
    pub right_volume: Decimal,
    pub left_count: usize,
    pub right_count: usize,
    /// Bonus on the weaker leg's volume at the configured rate.
    pub binary_bonus: Decimal,
    /// Projection if the weaker leg caught up to the stronger one.
    pub next_binary_bonus: Decimal,
}

#[derive(Debug, Error)]
pub enum DistributionError {
    #[error(transparent)]
    Calculation(#[from] CalculationError),
    #[error("member {0} not found")]
    MemberNotFound(MemberId),
    #[error("sale {0} already distributed")]
    AlreadyDistributed(Uuid),
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl Distributor {
    pub fn new(
        repo: Arc<Repository>,
        stats: TreeStatsEngine,
        structure: CommissionStructure,
        root_member_id: MemberId,
    ) -> Self {
        Self {
            repo,
            classic: ClassicEngine::new(root_member_id),
            monoline: MonolineEngine::new(),
            ledger: LedgerApplier::new(),
            stats,
            structure,
            root_member_id,
        }
    }

    /// Distribute commissions for one monoline unit sale.
    ///
    /// Callers may pass a stable `sale_id` for retry-safe invocation; a
    /// repeated id is rejected as already distributed.
    pub async fn distribute_monoline_sale(
        &self,
        buyer_id: MemberId,
        sale_id: Option<Uuid>,
    ) -> Result<MonolineDistribution, DistributionError> {
        if self.repo.get_member(buyer_id).await?.is_none() {
            return Err(DistributionError::MemberNotFound(buyer_id));
        }

        let sale_id = sale_id.unwrap_or_else(Uuid::new_v4);
        let now = TimeMs::now();
        let unit_price = self.structure.unit_price;

        self.repo
            .insert_sale(&SaleRecord {
                id: sale_id,
                buyer_id,
                kind: "monoline".to_string(),
                amount: unit_price,
                commission_distributed: false,
                created_ms: now,
            })
            .await?;
        if !self.repo.mark_sale_distributed(sale_id).await? {
            return Err(DistributionError::AlreadyDistributed(sale_id));
        }

        let directory = MemberDirectory::new(self.repo.load_all_members().await?);
        let mut outcome = self
            .monoline
            .calculate(&directory, buyer_id, &self.structure, sale_id, now)?;
        let mut members = directory.into_members();

        // The sale counts toward the buyer's own volume and investment.
        if let Some(buyer) = members.get_mut(&buyer_id) {
            buyer.monthly_sales += unit_price;
            buyer.annual_sales += unit_price;
            buyer.total_investment += unit_price;
        }

        // Company fund (fixed share plus forfeitures) lands on the root
        // member's balance; it is an amount, not a per-member payout.
        if let Some(root) = members.get_mut(&self.root_member_id) {
            root.wallet
                .credit(CommissionCategory::CompanyFund, outcome.company_fund_amount);
        }

        let report = self.ledger.apply(&mut outcome.transactions, &mut members, now);
        self.persist(&outcome.transactions, &members, &[buyer_id, self.root_member_id])
            .await?;

        tracing::info!(
            sale = %sale_id,
            buyer = %buyer_id,
            distributed = %outcome.total_distributed,
            forfeited = %outcome.forfeited_to_company,
            "monoline sale distributed"
        );

        Ok(MonolineDistribution {
            sale_id,
            transactions: outcome.transactions,
            passive_pool_amount: outcome.passive_pool_amount,
            company_fund_amount: outcome.company_fund_amount,
            total_distributed: outcome.total_distributed,
            forfeited_to_company: outcome.forfeited_to_company,
            ledger: report,
        })
    }

    /// Distribute commissions for a classic membership purchase.
    pub async fn distribute_classic_purchase(
        &self,
        buyer_id: MemberId,
        amount: Decimal,
        purchase_id: Option<Uuid>,
    ) -> Result<ClassicDistribution, DistributionError> {
        if !amount.is_positive() {
            return Err(DistributionError::NonPositiveAmount(amount));
        }
        if self.repo.get_member(buyer_id).await?.is_none() {
            return Err(DistributionError::MemberNotFound(buyer_id));
        }

        let purchase_id = purchase_id.unwrap_or_else(Uuid::new_v4);
        let now = TimeMs::now();

        self.repo
            .insert_sale(&SaleRecord {
                id: purchase_id,
                buyer_id,
                kind: "classic".to_string(),
                amount,
                commission_distributed: false,
                created_ms: now,
            })
            .await?;
        if !self.repo.mark_sale_distributed(purchase_id).await? {
            return Err(DistributionError::AlreadyDistributed(purchase_id));
        }

        let directory = MemberDirectory::new(self.repo.load_all_members().await?);
        let outcome = self.classic.calculate(
            &directory,
            buyer_id,
            amount,
            &self.structure,
            purchase_id,
            now,
        )?;
        let mut members = directory.into_members();
        let mut transactions = outcome.transactions;

        // A package purchase raises the buyer's lifetime investment and
        // activates them.
        if let Some(buyer) = members.get_mut(&buyer_id) {
            buyer.total_investment += amount;
            buyer.is_active = true;
        }

        let report = self.ledger.apply(&mut transactions, &mut members, now);
        self.persist(&transactions, &members, &[buyer_id]).await?;

        Ok(ClassicDistribution {
            purchase_id,
            transactions,
            total_allocated: outcome.total_allocated,
            ledger: report,
        })
    }

    /// Evenly distribute an accumulated passive pool to fully-active
    /// members. Scheduled operation; zero recipients is a clean no-op.
    pub async fn distribute_passive_pool(
        &self,
        total_pool: Decimal,
    ) -> Result<PassiveDistribution, DistributionError> {
        if !total_pool.is_positive() {
            return Err(DistributionError::NonPositiveAmount(total_pool));
        }

        let now = TimeMs::now();
        let directory = MemberDirectory::new(self.repo.load_all_members().await?);
        let outcome = self.monoline.distribute_passive_pool(
            &directory,
            total_pool,
            &self.structure.thresholds,
            now,
        );

        match outcome {
            PassivePoolOutcome::NoActiveMembers => {
                tracing::info!(pool = %total_pool, "no fully-active members, passive pool untouched");
                Ok(PassiveDistribution {
                    amount_per_member: Decimal::zero(),
                    recipient_count: 0,
                    total_distributed: Decimal::zero(),
                    transactions: Vec::new(),
                    ledger: LedgerReport::default(),
                })
            }
            PassivePoolOutcome::Distributed {
                amount_per_member,
                mut transactions,
                total_distributed,
            } => {
                let mut members = directory.into_members();
                let report = self.ledger.apply(&mut transactions, &mut members, now);
                self.persist(&transactions, &members, &[]).await?;

                Ok(PassiveDistribution {
                    amount_per_member,
                    recipient_count: transactions.len(),
                    total_distributed,
                    transactions,
                    ledger: report,
                })
            }
        }
    }

    /// Left/right leg summary plus binary bonus projection.
    pub async fn binary_network_stats(
        &self,
        member_id: MemberId,
    ) -> Result<BinaryNetworkStats, DistributionError> {
        let directory = MemberDirectory::new(self.repo.load_all_members().await?);
        let member = directory
            .get(member_id)
            .ok_or(DistributionError::MemberNotFound(member_id))?;

        let leg = |child: Option<MemberId>| match child {
            Some(id) => {
                let stats = self.stats.subtree_stats(&directory, id);
                (stats.volume, stats.team_size + 1)
            }
            None => (Decimal::zero(), 0),
        };
        let (left_volume, left_count) = leg(member.left_child);
        let (right_volume, right_count) = leg(member.right_child);

        let (weaker, stronger) = if left_volume <= right_volume {
            (left_volume, right_volume)
        } else {
            (right_volume, left_volume)
        };

        Ok(BinaryNetworkStats {
            left_volume,
            right_volume,
            left_count,
            right_count,
            binary_bonus: self.structure.binary_rate.percent_of(weaker).round_money(),
            next_binary_bonus: self.structure.binary_rate.percent_of(stronger).round_money(),
        })
    }

    /// Persist settled transactions and the wallets they touched.
    async fn persist(
        &self,
        transactions: &[CommissionTransaction],
        members: &HashMap<MemberId, Member>,
        extra_members: &[MemberId],
    ) -> Result<(), sqlx::Error> {
        self.repo.insert_transactions_batch(transactions).await?;

        let mut touched: HashSet<MemberId> = transactions
            .iter()
            .map(|t| t.recipient_id)
            .collect();
        touched.extend(extra_members.iter().copied());

        let changed: Vec<Member> = touched
            .into_iter()
            .filter_map(|id| members.get(&id).cloned())
            .collect();
        self.repo.update_members_batch(&changed).await
    }
}
