//! Injected statistics cache.
//!
//! Subtree statistics are expensive to recompute over a large population, so
//! the stats engine consults a cache keyed by member id. The cache is an
//! explicit capability (get / put / invalidate) so tests can substitute a
//! no-op and tree mutations can clear it conservatively.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{MemberId, TimeMs};

use super::stats::SubtreeStats;

/// Cache capability for subtree statistics.
///
/// A stale entry within the TTL window is tolerable; a stale entry surviving
/// a tree mutation is not. Mutating operations must call `invalidate_all`.
pub trait StatsCache: Send + Sync {
    fn get(&self, id: MemberId, now: TimeMs) -> Option<SubtreeStats>;
    fn put(&self, id: MemberId, stats: SubtreeStats, now: TimeMs);
    /// Coarse full clear. Precise subtree-scoped invalidation is not
    /// required; correctness comes from clearing everything.
    fn invalidate_all(&self);
}

/// TTL-bounded in-memory cache.
pub struct TtlStatsCache {
    ttl_ms: i64,
    entries: Mutex<HashMap<MemberId, (TimeMs, SubtreeStats)>>,
}

impl TtlStatsCache {
    pub fn new(ttl_ms: i64) -> Self {
        TtlStatsCache {
            ttl_ms,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl StatsCache for TtlStatsCache {
    fn get(&self, id: MemberId, now: TimeMs) -> Option<SubtreeStats> {
        let entries = self.entries.lock().expect("stats cache poisoned");
        let (stored_at, stats) = entries.get(&id)?;
        if now.as_ms().saturating_sub(stored_at.as_ms()) > self.ttl_ms {
            return None;
        }
        Some(stats.clone())
    }

    fn put(&self, id: MemberId, stats: SubtreeStats, now: TimeMs) {
        let mut entries = self.entries.lock().expect("stats cache poisoned");
        entries.insert(id, (now, stats));
    }

    fn invalidate_all(&self) {
        let mut entries = self.entries.lock().expect("stats cache poisoned");
        entries.clear();
    }
}

/// Cache that never stores anything. Used by tests and one-off passes.
pub struct NoopStatsCache;

impl StatsCache for NoopStatsCache {
    fn get(&self, _id: MemberId, _now: TimeMs) -> Option<SubtreeStats> {
        None
    }

    fn put(&self, _id: MemberId, _stats: SubtreeStats, _now: TimeMs) {}

    fn invalidate_all(&self) {}
}
