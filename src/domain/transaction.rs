//! Commission transactions: one payout from one sale to one recipient.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Decimal, MemberId, TimeMs};

/// What a payout is for. Persisted as a stable string encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionCategory {
    /// Direct sponsor bonus.
    Sponsor,
    /// Career depth bonus at upline level N (1-based).
    Level(u8),
    /// Binary network bonus.
    Binary,
    /// Passive income pool share.
    Passive,
    /// Company fund allocation (including forfeited level amounts).
    CompanyFund,
}

impl CommissionCategory {
    pub fn encode(&self) -> String {
        match self {
            CommissionCategory::Sponsor => "sponsor".to_string(),
            CommissionCategory::Level(n) => format!("level_{}", n),
            CommissionCategory::Binary => "binary".to_string(),
            CommissionCategory::Passive => "passive".to_string(),
            CommissionCategory::CompanyFund => "company_fund".to_string(),
        }
    }

    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "sponsor" => Some(CommissionCategory::Sponsor),
            "binary" => Some(CommissionCategory::Binary),
            "passive" => Some(CommissionCategory::Passive),
            "company_fund" => Some(CommissionCategory::CompanyFund),
            other => other
                .strip_prefix("level_")
                .and_then(|n| n.parse::<u8>().ok())
                .map(CommissionCategory::Level),
        }
    }
}

/// Lifecycle of a transaction: pending until the ledger applies it.
///
/// Only pending -> processed and pending -> failed transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Processed,
    Failed,
}

impl TransactionStatus {
    pub fn encode(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processed => "processed",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransactionStatus::Pending),
            "processed" => Some(TransactionStatus::Processed),
            "failed" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }
}

/// One commission payout record.
///
/// Immutable once created except for the status/settled_ms transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionTransaction {
    pub id: Uuid,
    /// Identifier of the sale/purchase event that triggered the payout.
    pub sale_id: Uuid,
    pub buyer_id: MemberId,
    pub recipient_id: MemberId,
    pub category: CommissionCategory,
    /// Percentage rate that produced the amount, when the model is
    /// rate-based (classic). None for fixed-amount (monoline) payouts.
    pub rate: Option<Decimal>,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub created_ms: TimeMs,
    pub settled_ms: Option<TimeMs>,
}

impl CommissionTransaction {
    pub fn new(
        sale_id: Uuid,
        buyer_id: MemberId,
        recipient_id: MemberId,
        category: CommissionCategory,
        rate: Option<Decimal>,
        amount: Decimal,
        created_ms: TimeMs,
    ) -> Self {
        CommissionTransaction {
            id: Uuid::new_v4(),
            sale_id,
            buyer_id,
            recipient_id,
            category,
            rate,
            amount,
            status: TransactionStatus::Pending,
            created_ms,
            settled_ms: None,
        }
    }

    /// Mark the terminal state. A terminal transaction never transitions
    /// again; callers must check `status` first.
    pub fn settle(&mut self, status: TransactionStatus, at: TimeMs) {
        debug_assert!(self.status == TransactionStatus::Pending);
        self.status = status;
        self.settled_ms = Some(at);
    }
}
