use crate::smoothing::core::snapshot_interpolation::snapshot::Snapshot;
use crate::smoothing::core::snapshot_interpolation::snapshot_interpolation::SnapshotInterpolation;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// What a full buffer does with a snapshot for a new remote time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    #[default]
    DropNewest,
    EvictOldest,
}

/// Bounded snapshot buffer sorted by remote time.
///
/// Sizes are single or low double digits, so lookups by position are linear scans.
#[derive(Debug, Clone)]
pub struct SnapshotBuffer<T: Snapshot> {
    snapshots: BTreeMap<OrderedFloat<f64>, T>,
    limit: usize,
    overflow_policy: OverflowPolicy,
}

impl<T: Snapshot> SnapshotBuffer<T> {
    pub fn new(limit: usize) -> Self {
        Self::with_policy(limit, OverflowPolicy::DropNewest)
    }

    pub fn with_policy(limit: usize, overflow_policy: OverflowPolicy) -> Self {
        Self {
            snapshots: BTreeMap::new(),
            limit,
            overflow_policy,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.snapshots.len() >= self.limit
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow_policy
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.snapshots.values().nth(index)
    }

    pub fn oldest(&self) -> Option<&T> {
        self.snapshots.values().next()
    }

    pub fn newest(&self) -> Option<&T> {
        self.snapshots.values().next_back()
    }

    pub fn latest_remote_time(&self) -> Option<f64> {
        self.snapshots.keys().next_back().map(|key| key.into_inner())
    }

    pub fn remote_times(&self) -> Vec<f64> {
        self.snapshots.keys().map(|key| key.into_inner()).collect()
    }

    // local arrival gap between the two newest snapshots by remote time
    pub fn latest_delivery_interval(&self) -> Option<f64> {
        let mut newest_first = self.snapshots.values().rev();
        let last = newest_first.next()?;
        let previous = newest_first.next()?;
        Some(last.local_time() - previous.local_time())
    }

    /// Inserts `snapshot` keyed by its remote time.
    ///
    /// Returns true only when a new remote time was added. An existing remote time
    /// gets its snapshot overwritten and returns false. A full buffer follows the
    /// overflow policy.
    pub fn insert_if_not_exists(&mut self, snapshot: T) -> bool {
        let key = OrderedFloat(snapshot.remote_time());
        if self.snapshots.len() >= self.limit {
            match self.overflow_policy {
                OverflowPolicy::DropNewest => return false,
                OverflowPolicy::EvictOldest => {
                    if self.limit == 0 {
                        return false;
                    }
                    if let Some(existing) = self.snapshots.get_mut(&key) {
                        *existing = snapshot;
                        return false;
                    }
                    // older than everything we hold, it would be evicted right away
                    if self.snapshots.keys().next().map_or(false, |oldest| key < *oldest) {
                        return false;
                    }
                    while self.snapshots.len() >= self.limit {
                        self.snapshots.pop_first();
                    }
                }
            }
        }

        match self.snapshots.entry(key) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(snapshot);
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(snapshot);
                true
            }
        }
    }

    /// Finds the adjacent pair bracketing `local_timeline`.
    ///
    /// Returns `(from, to, t)` as buffer indices and ratio. Before the oldest
    /// snapshot both indices point at the oldest, past the newest both point at
    /// the newest, with `t = 0`. `None` only for an empty buffer.
    pub fn sample(&self, local_timeline: f64) -> Option<(usize, usize, f64)> {
        if self.snapshots.is_empty() {
            return None;
        }

        let pairs = self.snapshots.values().zip(self.snapshots.values().skip(1));
        for (i, (first, second)) in pairs.enumerate() {
            if local_timeline < first.remote_time() || local_timeline > second.remote_time() {
                continue;
            }
            let t = SnapshotInterpolation::inverse_lerp(
                first.remote_time(),
                second.remote_time(),
                local_timeline,
            );
            return Some((i, i + 1, t));
        }

        let oldest = self.oldest()?;
        if oldest.remote_time() > local_timeline {
            Some((0, 0, 0.0))
        } else {
            let last = self.snapshots.len() - 1;
            Some((last, last, 0.0))
        }
    }

    pub fn step_interpolation(&mut self, local_timeline: f64) -> Option<(T, T, f64)> {
        let (from, to, t) = self.sample(local_timeline)?;
        let from_snapshot = self.get(from)?.clone();
        let to_snapshot = self.get(to)?.clone();
        self.remove_range(from);
        Some((from_snapshot, to_snapshot, t))
    }

    pub fn remove_range(&mut self, amount: usize) {
        for _ in 0..amount {
            if self.snapshots.pop_first().is_none() {
                break;
            }
        }
    }
}
