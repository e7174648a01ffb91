//! Ledger applier: turns pending commission transactions into wallet
//! balances and terminal transaction states.
//!
//! Application is idempotent per transaction id: a transaction already in a
//! terminal state is never credited again. A failed lookup fails only that
//! transaction; earlier credits in the same batch stand (at-least-applied
//! semantics, matching fire-and-forget upline traversal).

use std::collections::HashMap;

use crate::domain::{CommissionTransaction, Member, MemberId, TimeMs, TransactionStatus};

/// Summary of one application batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerReport {
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Applies transactions to member wallets.
#[derive(Debug, Clone, Default)]
pub struct LedgerApplier;

impl LedgerApplier {
    pub fn new() -> Self {
        LedgerApplier
    }

    /// Apply a batch of transactions against a mutable member set.
    ///
    /// Transitions each pending transaction to processed (wallet credited)
    /// or failed (recipient missing). Non-pending transactions are skipped.
    pub fn apply(
        &self,
        transactions: &mut [CommissionTransaction],
        members: &mut HashMap<MemberId, Member>,
        now: TimeMs,
    ) -> LedgerReport {
        let mut report = LedgerReport::default();

        for tx in transactions.iter_mut() {
            if tx.status != TransactionStatus::Pending {
                report.skipped += 1;
                continue;
            }
            match members.get_mut(&tx.recipient_id) {
                Some(recipient) => {
                    recipient.wallet.credit(tx.category, tx.amount);
                    tx.settle(TransactionStatus::Processed, now);
                    report.processed += 1;
                }
                None => {
                    tracing::warn!(
                        recipient = %tx.recipient_id,
                        tx_id = %tx.id,
                        "commission recipient missing, failing transaction"
                    );
                    tx.settle(TransactionStatus::Failed, now);
                    report.failed += 1;
                }
            }
        }

        report
    }
}
