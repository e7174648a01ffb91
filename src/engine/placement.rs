//! Binary auto-placement: finds the tree slot for a new member.
//!
//! Two strategies share the scoring machinery:
//! - greedy weaker-leg descent (`place`), the default registration path;
//! - exhaustive enumeration and scoring (`find_available_positions` /
//!   `place_best`) when the caller wants global rather than greedy choice.

use thiserror::Error;

use crate::directory::MemberDirectory;
use crate::domain::{Decimal, MemberId, Side};

use super::stats::TreeStatsEngine;

/// How two legs are compared during descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlacementAlgorithm {
    /// Raw team sizes.
    SizeBased,
    /// Raw subtree volumes.
    VolumeBased,
    /// Max depths, preferring shallower.
    DepthFirst,
    /// Weighted leg-score composite.
    #[default]
    Balanced,
}

impl PlacementAlgorithm {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "size_based" => Some(PlacementAlgorithm::SizeBased),
            "volume_based" => Some(PlacementAlgorithm::VolumeBased),
            "depth_first" => Some(PlacementAlgorithm::DepthFirst),
            "balanced" => Some(PlacementAlgorithm::Balanced),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementAlgorithm::SizeBased => "size_based",
            PlacementAlgorithm::VolumeBased => "volume_based",
            PlacementAlgorithm::DepthFirst => "depth_first",
            PlacementAlgorithm::Balanced => "balanced",
        }
    }
}

impl std::fmt::Display for PlacementAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Caller preferences for one placement decision.
#[derive(Debug, Clone, Default)]
pub struct PlacementPreferences {
    /// Requested leg; short-circuits scoring entirely when that side of the
    /// sponsor is open.
    pub preferred_side: Option<Side>,
    /// Penalize candidates whose sibling legs are already badly imbalanced.
    pub overload_penalty: bool,
    /// Favor parents with higher career levels.
    pub career_level_bonus: bool,
}

/// Where the new member goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementDecision {
    pub parent_id: MemberId,
    pub side: Side,
    /// Hops below the resolved sponsor (1 = directly under them).
    pub depth: usize,
}

/// One open slot, scored. Ephemeral; produced and consumed within a single
/// placement decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementCandidate {
    pub parent_id: MemberId,
    pub side: Side,
    pub depth: usize,
    pub score: Decimal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlacementError {
    /// Neither the requested sponsor nor the configured root resolves.
    #[error("sponsor {0} not found and no root fallback available")]
    SponsorNotFound(MemberId),
    /// Every slot within the search bound is taken.
    #[error("no open slot within depth {max_depth} using {algorithm}")]
    NoSlotAvailable {
        algorithm: PlacementAlgorithm,
        max_depth: usize,
    },
}

/// Decides tree positions for new members.
#[derive(Clone)]
pub struct PlacementEngine {
    stats: TreeStatsEngine,
    root_member_id: MemberId,
    overload_threshold: Decimal,
    career_bonus_step: Decimal,
}

impl PlacementEngine {
    pub fn new(stats: TreeStatsEngine, root_member_id: MemberId) -> Self {
        let d = |s: &str| Decimal::from_str_canonical(s).expect("invalid decimal literal");
        PlacementEngine {
            stats,
            root_member_id,
            overload_threshold: d("0.5"),
            career_bonus_step: d("0.05"),
        }
    }

    /// Resolve the effective sponsor: the requested one if it exists,
    /// otherwise the configured root member.
    fn resolve_sponsor(
        &self,
        directory: &MemberDirectory,
        sponsor_id: Option<MemberId>,
    ) -> Result<MemberId, PlacementError> {
        if let Some(id) = sponsor_id {
            if directory.get(id).is_some() {
                return Ok(id);
            }
        }
        if directory.get(self.root_member_id).is_some() {
            Ok(self.root_member_id)
        } else {
            Err(PlacementError::SponsorNotFound(
                sponsor_id.unwrap_or(self.root_member_id),
            ))
        }
    }

    /// Greedy weaker-leg placement.
    ///
    /// Fills the first empty slot on the descent path (left preferred when
    /// both are empty); with both slots full, descends into the leg scoring
    /// lower under `algorithm`. Fails explicitly once `max_search_depth`
    /// hops are exhausted; it never parks a member at an arbitrary slot.
    pub fn place(
        &self,
        directory: &MemberDirectory,
        sponsor_id: Option<MemberId>,
        algorithm: PlacementAlgorithm,
        max_search_depth: usize,
        preferences: &PlacementPreferences,
    ) -> Result<PlacementDecision, PlacementError> {
        let sponsor = self.resolve_sponsor(directory, sponsor_id)?;

        if let Some(side) = preferences.preferred_side {
            let sponsor_member = directory.get(sponsor).ok_or_else(|| {
                PlacementError::SponsorNotFound(sponsor)
            })?;
            // Requested leg first, its sibling second; only a full sponsor
            // falls through to the scored search.
            for candidate in [side, side.opposite()] {
                if sponsor_member.child(candidate).is_none() {
                    return Ok(PlacementDecision {
                        parent_id: sponsor,
                        side: candidate,
                        depth: 1,
                    });
                }
            }
        }

        let mut current = sponsor;
        for depth in 1..=max_search_depth {
            let member = match directory.get(current) {
                Some(m) => m,
                None => break, // dangling pointer mid-descent
            };

            match (member.left_child, member.right_child) {
                (None, _) => {
                    return Ok(PlacementDecision {
                        parent_id: current,
                        side: Side::Left,
                        depth,
                    })
                }
                (Some(_), None) => {
                    return Ok(PlacementDecision {
                        parent_id: current,
                        side: Side::Right,
                        depth,
                    })
                }
                (Some(left), Some(right)) => {
                    current = self.weaker_leg(directory, left, right, algorithm);
                }
            }
        }

        Err(PlacementError::NoSlotAvailable {
            algorithm,
            max_depth: max_search_depth,
        })
    }

    /// The leg to descend into: strictly lower measure wins, ties go left.
    fn weaker_leg(
        &self,
        directory: &MemberDirectory,
        left: MemberId,
        right: MemberId,
        algorithm: PlacementAlgorithm,
    ) -> MemberId {
        let left_stats = self.stats.subtree_stats(directory, left);
        let right_stats = self.stats.subtree_stats(directory, right);

        let descend_right = match algorithm {
            PlacementAlgorithm::SizeBased => right_stats.team_size < left_stats.team_size,
            PlacementAlgorithm::VolumeBased => right_stats.volume < left_stats.volume,
            PlacementAlgorithm::DepthFirst => right_stats.max_depth < left_stats.max_depth,
            PlacementAlgorithm::Balanced => {
                self.stats.leg_score(&right_stats) < self.stats.leg_score(&left_stats)
            }
        };

        if descend_right {
            right
        } else {
            left
        }
    }

    /// Enumerate every open slot within `max_depth` hops of `start`,
    /// depth-first over both children, scored for `place_best`.
    pub fn find_available_positions(
        &self,
        directory: &MemberDirectory,
        start: MemberId,
        max_depth: usize,
        preferences: &PlacementPreferences,
    ) -> Vec<PlacementCandidate> {
        let mut candidates = Vec::new();
        let mut stack: Vec<(MemberId, usize)> = vec![(start, 1)];

        while let Some((current, depth)) = stack.pop() {
            if depth > max_depth {
                continue;
            }
            let member = match directory.get(current) {
                Some(m) => m,
                None => continue,
            };

            for side in [Side::Left, Side::Right] {
                match member.child(side) {
                    None => candidates.push(self.score_candidate(
                        directory,
                        member.id,
                        side,
                        depth,
                        preferences,
                    )),
                    Some(child) => stack.push((child, depth + 1)),
                }
            }
        }

        // Deterministic order: best score first, then shallow, then left.
        candidates.sort_by(|a, b| {
            a.score
                .cmp(&b.score)
                .then(a.depth.cmp(&b.depth))
                .then(a.parent_id.cmp(&b.parent_id))
                .then((a.side == Side::Right).cmp(&(b.side == Side::Right)))
        });
        candidates
    }

    /// Exhaustive search-and-score placement: the lowest-scoring open slot.
    pub fn place_best(
        &self,
        directory: &MemberDirectory,
        sponsor_id: Option<MemberId>,
        max_search_depth: usize,
        preferences: &PlacementPreferences,
    ) -> Result<PlacementDecision, PlacementError> {
        let sponsor = self.resolve_sponsor(directory, sponsor_id)?;
        let candidates =
            self.find_available_positions(directory, sponsor, max_search_depth, preferences);
        candidates
            .first()
            .map(|c| PlacementDecision {
                parent_id: c.parent_id,
                side: c.side,
                depth: c.depth,
            })
            .ok_or(PlacementError::NoSlotAvailable {
                algorithm: PlacementAlgorithm::Balanced,
                max_depth: max_search_depth,
            })
    }

    fn score_candidate(
        &self,
        directory: &MemberDirectory,
        parent_id: MemberId,
        side: Side,
        depth: usize,
        preferences: &PlacementPreferences,
    ) -> PlacementCandidate {
        let parent_stats = self.stats.subtree_stats(directory, parent_id);
        let mut score = self.stats.leg_score(&parent_stats);

        if preferences.overload_penalty {
            score += self.overload_penalty(directory, parent_id);
        }
        if preferences.career_level_bonus {
            if let Some(parent) = directory.get(parent_id) {
                // Higher-ranked parents become more attractive.
                score = score
                    - self.career_bonus_step * Decimal::from_count(parent.career_level as usize);
            }
        }

        PlacementCandidate {
            parent_id,
            side,
            depth,
            score,
        }
    }

    /// Imbalance between a parent's two legs beyond the configured
    /// threshold makes its open slots less attractive.
    fn overload_penalty(&self, directory: &MemberDirectory, parent_id: MemberId) -> Decimal {
        let parent = match directory.get(parent_id) {
            Some(p) => p,
            None => return Decimal::zero(),
        };
        let leg_score = |child: Option<MemberId>| match child {
            Some(id) => {
                let stats = self.stats.subtree_stats(directory, id);
                self.stats.leg_score(&stats)
            }
            None => Decimal::zero(),
        };
        let left = leg_score(parent.left_child);
        let right = leg_score(parent.right_child);
        let imbalance = if left > right { left - right } else { right - left };
        if imbalance > self.overload_threshold {
            imbalance - self.overload_threshold
        } else {
            Decimal::zero()
        }
    }
}
