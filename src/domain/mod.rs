//! Domain types for the commission distribution engine.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper
//! - Domain primitives: MemberId, MemberCode, Side, TimeMs
//! - Member and Wallet records
//! - Commission transaction types with a pending/processed/failed lifecycle
//! - Validated commission structure and activity thresholds

pub mod decimal;
pub mod member;
pub mod primitives;
pub mod settings;
pub mod transaction;

pub use decimal::{Decimal, MONEY_DP};
pub use member::{Member, Wallet};
pub use primitives::{MemberCode, MemberId, Side, TimeMs};
pub use settings::{ActivityThresholds, CommissionStructure, StructureError, UPLINE_LEVELS};
pub use transaction::{CommissionCategory, CommissionTransaction, TransactionStatus};
