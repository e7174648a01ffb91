//! Registration flow: assign a member code, resolve the sponsor, place the
//! new member in the binary tree, and persist the linkage.

use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::db::Repository;
use crate::directory::MemberDirectory;
use crate::domain::{MemberCode, MemberId, TimeMs};
use crate::engine::{
    PlacementDecision, PlacementEngine, PlacementError, PlacementPreferences, StatsCache,
};

/// Snapshot-and-claim attempts before giving up on a contended tree.
const PLACEMENT_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct Registrar {
    repo: Arc<Repository>,
    placement: PlacementEngine,
    cache: Arc<dyn StatsCache>,
    config: Config,
}

#[derive(Debug)]
pub struct RegistrationResult {
    pub member_id: MemberId,
    pub code: MemberCode,
    pub placement: PlacementDecision,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error("sponsor code {0} does not exist")]
    SponsorCodeUnknown(MemberCode),
    #[error("placement slot contended, retries exhausted")]
    SlotContended,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl Registrar {
    pub fn new(
        repo: Arc<Repository>,
        placement: PlacementEngine,
        cache: Arc<dyn StatsCache>,
        config: Config,
    ) -> Self {
        Self {
            repo,
            placement,
            cache,
            config,
        }
    }

    /// Register a new member under a sponsor.
    ///
    /// A missing sponsor code falls back to the configured root member; an
    /// explicitly wrong code is rejected instead of silently rerouted.
    pub async fn register(
        &self,
        sponsor_code: Option<&MemberCode>,
        preferences: &PlacementPreferences,
    ) -> Result<RegistrationResult, RegistrationError> {
        let sponsor_id = match sponsor_code {
            Some(code) => Some(
                self.repo
                    .get_member_by_code(code)
                    .await?
                    .ok_or_else(|| RegistrationError::SponsorCodeUnknown(code.clone()))?
                    .id,
            ),
            None => None,
        };

        // The slot is chosen from a snapshot, so a concurrent registration
        // can claim it first. Insert and slot-claim run in one transaction;
        // a lost race rolls back and the placement is retried from a fresh
        // snapshot.
        for _ in 0..PLACEMENT_ATTEMPTS {
            let directory = MemberDirectory::new(self.repo.load_all_members().await?);
            let decision = self.placement.place(
                &directory,
                sponsor_id,
                self.config.placement_algorithm,
                self.config.max_search_depth,
                preferences,
            )?;

            match self
                .repo
                .insert_member_attached(decision.parent_id, decision.side, TimeMs::now())
                .await
            {
                Ok((member_id, code)) => {
                    // Ancestor team sizes changed; the conservative contract
                    // is a full cache clear.
                    self.cache.invalidate_all();

                    tracing::info!(
                        member = %member_id,
                        code = %code,
                        parent = %decision.parent_id,
                        side = %decision.side,
                        depth = decision.depth,
                        "placed new member"
                    );

                    return Ok(RegistrationResult {
                        member_id,
                        code,
                        placement: decision,
                    });
                }
                Err(sqlx::Error::RowNotFound) => {
                    tracing::warn!(
                        parent = %decision.parent_id,
                        side = %decision.side,
                        "placement slot claimed concurrently, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RegistrationError::SlotContended)
    }
}
