//! Pure computation engines for the commission core.
//!
//! Every engine works over a `MemberDirectory` snapshot and produces values
//! or pending transactions; nothing here touches storage. The only shared
//! mutable state is the injected statistics cache.

use thiserror::Error;

use crate::domain::MemberId;

pub mod cache;
pub mod classic;
pub mod eligibility;
pub mod ledger;
pub mod monoline;
pub mod placement;
pub mod stats;

pub use cache::{NoopStatsCache, StatsCache, TtlStatsCache};
pub use classic::{ClassicEngine, ClassicOutcome};
pub use eligibility::{is_fully_active, ActivityStatus};
pub use ledger::{LedgerApplier, LedgerReport};
pub use monoline::{MonolineEngine, MonolineOutcome, PassivePoolOutcome};
pub use placement::{
    PlacementAlgorithm, PlacementCandidate, PlacementDecision, PlacementEngine, PlacementError,
    PlacementPreferences,
};
pub use stats::{LegScoreWeights, SubtreeStats, TreeStatsEngine};

/// Failures shared by the commission calculators.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalculationError {
    #[error("buyer {0} not found in member directory")]
    BuyerNotFound(MemberId),
}
