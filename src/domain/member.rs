//! Member record and wallet.
//!
//! A member is a node in the binary sponsorship tree plus the activity
//! metrics and wallet balances the commission engines read and credit.

use serde::{Deserialize, Serialize};

use super::{CommissionCategory, Decimal, MemberCode, MemberId, Side, TimeMs};

/// Per-member wallet: running balance plus per-category earnings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub balance: Decimal,
    pub total_earnings: Decimal,
    pub sponsor_bonus: Decimal,
    pub career_bonus: Decimal,
    pub passive_income: Decimal,
    pub leadership_bonus: Decimal,
}

impl Wallet {
    /// Credit an amount under a commission category.
    ///
    /// Updates balance, total earnings, and the matching accumulator in one
    /// step so the three can never diverge.
    pub fn credit(&mut self, category: CommissionCategory, amount: Decimal) {
        self.balance += amount;
        self.total_earnings += amount;
        match category {
            CommissionCategory::Sponsor => self.sponsor_bonus += amount,
            CommissionCategory::Level(_) => self.career_bonus += amount,
            CommissionCategory::Binary => self.leadership_bonus += amount,
            CommissionCategory::Passive => self.passive_income += amount,
            // Company-fund credits land on the root member's balance only;
            // no per-category accumulator exists for them.
            CommissionCategory::CompanyFund => {}
        }
    }
}

/// A member of the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub code: MemberCode,
    /// Immediate upline; None only for the root member.
    pub sponsor_id: Option<MemberId>,
    pub left_child: Option<MemberId>,
    pub right_child: Option<MemberId>,
    pub career_level: u8,
    pub monthly_sales: Decimal,
    pub annual_sales: Decimal,
    pub total_investment: Decimal,
    pub is_active: bool,
    pub wallet: Wallet,
    pub joined_ms: TimeMs,
}

impl Member {
    /// Create a fresh member with empty wallet and no tree links.
    pub fn new(id: MemberId, code: MemberCode, sponsor_id: Option<MemberId>, joined_ms: TimeMs) -> Self {
        Member {
            id,
            code,
            sponsor_id,
            left_child: None,
            right_child: None,
            career_level: 0,
            monthly_sales: Decimal::zero(),
            annual_sales: Decimal::zero(),
            total_investment: Decimal::zero(),
            is_active: false,
            wallet: Wallet::default(),
            joined_ms,
        }
    }

    /// Child slot on the given side.
    pub fn child(&self, side: Side) -> Option<MemberId> {
        match side {
            Side::Left => self.left_child,
            Side::Right => self.right_child,
        }
    }

    /// Occupy a child slot. The slot must be empty; an occupied slot is
    /// never reassigned outside the explicit admin move path.
    pub fn set_child(&mut self, side: Side, child: MemberId) {
        match side {
            Side::Left => self.left_child = Some(child),
            Side::Right => self.right_child = Some(child),
        }
    }

}
