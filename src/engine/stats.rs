//! Tree statistics: team size, subtree volume, depth, leg scoring.

use std::sync::Arc;

use crate::directory::MemberDirectory;
use crate::domain::{Decimal, MemberId, Side, TimeMs};

use super::cache::StatsCache;

/// Aggregate statistics for a member's subtree (member included for volume
/// and active count; excluded from team size, which counts descendants).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtreeStats {
    pub team_size: usize,
    pub volume: Decimal,
    pub active_count: usize,
    pub max_depth: usize,
}

/// Weights and normalization divisors for the leg score composite.
///
/// Configuration constants, not derived from data.
#[derive(Debug, Clone)]
pub struct LegScoreWeights {
    pub team_weight: Decimal,
    pub volume_weight: Decimal,
    pub active_weight: Decimal,
    pub depth_weight: Decimal,
    pub team_norm: Decimal,
    pub volume_norm: Decimal,
    pub active_norm: Decimal,
    pub depth_norm: Decimal,
}

impl Default for LegScoreWeights {
    fn default() -> Self {
        let d = |s: &str| Decimal::from_str_canonical(s).expect("invalid decimal literal");
        LegScoreWeights {
            team_weight: d("0.4"),
            volume_weight: d("0.3"),
            active_weight: d("0.2"),
            depth_weight: d("0.1"),
            team_norm: d("100"),
            volume_norm: d("10000"),
            active_norm: d("50"),
            depth_norm: d("20"),
        }
    }
}

/// Computes subtree statistics over a directory snapshot, memoized through
/// an injected cache.
#[derive(Clone)]
pub struct TreeStatsEngine {
    cache: Arc<dyn StatsCache>,
    weights: LegScoreWeights,
}

impl TreeStatsEngine {
    pub fn new(cache: Arc<dyn StatsCache>) -> Self {
        TreeStatsEngine {
            cache,
            weights: LegScoreWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: LegScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Full subtree statistics for a member.
    ///
    /// Unknown ids yield zero statistics; callers treat "no subtree" as the
    /// zero value rather than an error.
    pub fn subtree_stats(&self, directory: &MemberDirectory, id: MemberId) -> SubtreeStats {
        let now = TimeMs::now();
        if let Some(cached) = self.cache.get(id, now) {
            return cached;
        }
        let stats = compute_subtree_stats(directory, id);
        self.cache.put(id, stats.clone(), now);
        stats
    }

    /// Count of all descendants under a member.
    pub fn team_size(&self, directory: &MemberDirectory, id: MemberId) -> usize {
        self.subtree_stats(directory, id).team_size
    }

    /// Sum of total investment across the member and descendants.
    pub fn subtree_volume(&self, directory: &MemberDirectory, id: MemberId) -> Decimal {
        self.subtree_stats(directory, id).volume
    }

    /// Longest descendant chain length.
    pub fn max_depth(&self, directory: &MemberDirectory, id: MemberId) -> usize {
        self.subtree_stats(directory, id).max_depth
    }

    /// Weighted composite used to compare two legs; lower means weaker.
    pub fn leg_score(&self, stats: &SubtreeStats) -> Decimal {
        let w = &self.weights;
        w.team_weight * (Decimal::from_count(stats.team_size) / w.team_norm)
            + w.volume_weight * (stats.volume / w.volume_norm)
            + w.active_weight * (Decimal::from_count(stats.active_count) / w.active_norm)
            + w.depth_weight * (Decimal::from_count(stats.max_depth) / w.depth_norm)
    }
}

/// Iterative traversal over child pointers.
///
/// An explicit stack rather than recursion: production trees are deep and
/// unbalanced, and a pathological chain must not overflow the call stack.
fn compute_subtree_stats(directory: &MemberDirectory, id: MemberId) -> SubtreeStats {
    let root = match directory.get(id) {
        Some(m) => m,
        None => return SubtreeStats::default(),
    };

    let mut stats = SubtreeStats::default();
    let mut stack: Vec<(MemberId, usize)> = vec![(root.id, 0)];

    while let Some((current_id, depth)) = stack.pop() {
        let member = match directory.get(current_id) {
            Some(m) => m,
            None => continue, // dangling child pointer
        };

        if depth > 0 {
            stats.team_size += 1;
        }
        stats.volume += member.total_investment;
        if member.is_active {
            stats.active_count += 1;
        }
        if depth > stats.max_depth {
            stats.max_depth = depth;
        }

        for side in [Side::Left, Side::Right] {
            if let Some(child) = member.child(side) {
                stack.push((child, depth + 1));
            }
        }
    }

    stats
}
