use crate::client::PendingTransaction;
use alloy_primitives::B256;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// A transaction under observation in the local mempool view.
#[derive(Debug, Clone)]
pub struct TrackedTransaction {
    /// Last-observed transaction terms.
    pub tx: PendingTransaction,
    /// When the transaction was first sighted. Immutable after insertion.
    pub first_seen: DateTime<Utc>,
    /// When the transaction was last sighted.
    pub last_seen: DateTime<Utc>,
    /// Endpoint that produced the first sighting.
    pub source: String,
}

/// Owner of the locally observed mempool state.
///
/// All mutation goes through these operations on the orchestrator task
/// (single-owner discipline), so the correlator always intersects against
/// a self-consistent snapshot.
#[derive(Debug, Default)]
pub struct MempoolTracker {
    entries: HashMap<B256, TrackedTransaction>,
}

impl MempoolTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a batch of pending observations into the tracked state.
    /// Unseen transactions are inserted with `first_seen == last_seen ==
    /// now`; already-tracked ones only get `last_seen` refreshed.
    pub fn refresh(
        &mut self,
        observations: Vec<PendingTransaction>,
        source: &str,
        now: DateTime<Utc>,
    ) {
        for tx in observations {
            match self.entries.get_mut(&tx.hash) {
                Some(tracked) => tracked.last_seen = now,
                None => {
                    self.entries.insert(
                        tx.hash,
                        TrackedTransaction {
                            tx,
                            first_seen: now,
                            last_seen: now,
                            source: source.to_string(),
                        },
                    );
                }
            }
        }
    }

    /// Drop every entry whose last sighting is strictly older than `ttl`.
    /// Returns the number of evicted entries.
    pub fn evict_expired(&mut self, ttl: Duration, now: DateTime<Utc>) -> usize {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.last_seen <= ttl);
        before - self.entries.len()
    }

    /// Unconditionally delete the given hashes. Called once per processed
    /// block, whether or not the block's record was persisted. Returns the
    /// number of entries actually removed.
    pub fn remove_confirmed<'a>(&mut self, hashes: impl IntoIterator<Item = &'a B256>) -> usize {
        hashes
            .into_iter()
            .filter(|hash| self.entries.remove(*hash).is_some())
            .count()
    }

    /// Snapshot of the tracked hashes for intersection with a block body.
    pub fn hashes(&self) -> HashSet<B256> {
        self.entries.keys().copied().collect()
    }

    /// Whether a hash is currently tracked.
    pub fn contains(&self, hash: &B256) -> bool {
        self.entries.contains_key(hash)
    }

    /// Tracked entry for a hash, if any.
    pub fn get(&self, hash: &B256) -> Option<&TrackedTransaction> {
        self.entries.get(hash)
    }

    /// Iterate over tracked entries.
    pub fn iter(&self) -> impl Iterator<Item = (&B256, &TrackedTransaction)> {
        self.entries.iter()
    }

    /// Number of tracked transactions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tracker is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::pending_legacy;
    use alloy_primitives::b256;

    const HASH_A: B256 =
        b256!("00000000000000000000000000000000000000000000000000000000000000aa");
    const HASH_B: B256 =
        b256!("00000000000000000000000000000000000000000000000000000000000000bb");

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn first_seen_is_write_once() {
        let mut tracker = MempoolTracker::new();
        tracker.refresh(vec![pending_legacy(HASH_A, 15, 1_000)], "a", at(0));
        tracker.refresh(vec![pending_legacy(HASH_A, 15, 1_000)], "b", at(10));
        tracker.refresh(vec![pending_legacy(HASH_A, 15, 1_000)], "a", at(25));

        let tracked = tracker.get(&HASH_A).unwrap();
        assert_eq!(tracked.first_seen, at(0));
        assert_eq!(tracked.last_seen, at(25));
        assert_eq!(tracked.source, "a");
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn eviction_boundary_is_strictly_greater() {
        let mut tracker = MempoolTracker::new();
        tracker.refresh(vec![pending_legacy(HASH_A, 15, 1_000)], "a", at(0));
        tracker.refresh(vec![pending_legacy(HASH_B, 5, 500)], "a", at(100));

        // A is exactly at the TTL boundary and must survive.
        let evicted = tracker.evict_expired(Duration::from_secs(180), at(180));
        assert_eq!(evicted, 0);
        assert!(tracker.contains(&HASH_A));

        // One second past the boundary evicts A but not the fresher B.
        let evicted = tracker.evict_expired(Duration::from_secs(180), at(181));
        assert_eq!(evicted, 1);
        assert!(!tracker.contains(&HASH_A));
        assert!(tracker.contains(&HASH_B));
    }

    #[test]
    fn refresh_resets_eviction_clock() {
        let mut tracker = MempoolTracker::new();
        tracker.refresh(vec![pending_legacy(HASH_A, 15, 1_000)], "a", at(0));
        tracker.refresh(vec![pending_legacy(HASH_A, 15, 1_000)], "a", at(150));

        let evicted = tracker.evict_expired(Duration::from_secs(180), at(200));
        assert_eq!(evicted, 0);
        assert!(tracker.contains(&HASH_A));
    }

    #[test]
    fn remove_confirmed_is_unconditional() {
        let mut tracker = MempoolTracker::new();
        tracker.refresh(vec![pending_legacy(HASH_A, 15, 1_000)], "a", at(0));

        let removed = tracker.remove_confirmed([&HASH_A, &HASH_B]);
        assert_eq!(removed, 1);
        assert!(tracker.is_empty());
    }
}
