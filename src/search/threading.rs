//! Threading primitives shared by the parallel perft strategies.
//!
//! Configuration, cooperative cancellation and the sharded transposition
//! table. Workers only ever share these three things; positions are owned by
//! the job that carries them.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::search::transposition_table::{TTEntry, TTStats, TranspositionTable};
use crate::search::zobrist::PositionKey;

/// Threading configuration owned by a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreadingConfig {
    /// 0 selects the machine's available parallelism.
    pub requested_threads: usize,
}

impl ThreadingConfig {
    #[inline]
    pub fn new(requested_threads: usize) -> Self {
        Self { requested_threads }
    }

    pub fn normalized_threads(self) -> usize {
        if self.requested_threads == 0 {
            thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            self.requested_threads
        }
    }
}

/// Tunables for the parallel strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    pub threading: ThreadingConfig,
    /// Jobs with more remaining depth than this are split into child jobs.
    pub split_depth: u8,
    pub tt_mb: usize,
    pub timeout: Option<Duration>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threading: ThreadingConfig::default(),
            split_depth: 2,
            tt_mb: 64,
            timeout: None,
        }
    }
}

/// Shared cancellation and accounting state for one search.
#[derive(Debug)]
pub struct SharedSearchState {
    stop: AtomicBool,
    pub nodes_visited: AtomicU64,
    deadline: Option<Instant>,
}

impl SharedSearchState {
    pub fn new() -> Arc<Self> {
        Self::with_deadline(None)
    }

    pub fn with_timeout(timeout: Duration) -> Arc<Self> {
        Self::with_deadline(Instant::now().checked_add(timeout))
    }

    fn with_deadline(deadline: Option<Instant>) -> Arc<Self> {
        Arc::new(Self {
            stop: AtomicBool::new(false),
            nodes_visited: AtomicU64::new(0),
            deadline,
        })
    }

    #[inline]
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// True once a stop was requested or the deadline has passed.
    #[inline]
    pub fn should_stop(&self) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return true;
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            self.request_stop();
            return true;
        }
        false
    }

    #[inline]
    pub fn add_nodes(&self, n: u64) {
        self.nodes_visited.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn nodes(&self) -> u64 {
        self.nodes_visited.load(Ordering::Relaxed)
    }
}

/// Transposition table split into independently locked shards.
#[derive(Debug)]
pub struct SharedTranspositionTable {
    shards: Vec<Mutex<TranspositionTable>>,
}

impl SharedTranspositionTable {
    /// `total_mb` bounds the sum over all shards.
    pub fn new_with_mb(total_mb: usize, shard_count: usize) -> Arc<Self> {
        let shards = shard_count.max(1);
        let bytes_per_shard = (total_mb.max(1) << 20) / shards;
        let mut vec = Vec::with_capacity(shards);
        for _ in 0..shards {
            vec.push(Mutex::new(TranspositionTable::new_with_bytes(bytes_per_shard)));
        }
        Arc::new(Self { shards: vec })
    }

    #[inline]
    fn shard_idx(&self, key: u64) -> usize {
        // Low bits pick the bucket inside a shard.
        ((key >> 48) as usize) % self.shards.len()
    }

    pub fn probe(&self, key: PositionKey, depth: u8) -> Option<u64> {
        self.shards[self.shard_idx(key.key)].lock().probe(key, depth)
    }

    pub fn store(&self, entry: TTEntry) {
        self.shards[self.shard_idx(entry.key)].lock().store(entry);
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().clear();
        }
    }

    pub fn allocated_bytes(&self) -> usize {
        self.shards.iter().map(|s| s.lock().allocated_bytes()).sum()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> TTStats {
        let mut merged = TTStats::default();
        for shard in &self.shards {
            let s = shard.lock().stats();
            merged.probes += s.probes;
            merged.hits += s.hits;
            merged.stores += s.stores;
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threading_config_normalizes_threads() {
        assert_eq!(ThreadingConfig::new(3).normalized_threads(), 3);
        assert!(ThreadingConfig::new(0).normalized_threads() >= 1);
    }

    #[test]
    fn shared_state_stop_and_node_accounting() {
        let state = SharedSearchState::new();
        assert!(!state.should_stop());
        state.add_nodes(10);
        assert_eq!(state.nodes(), 10);
        state.request_stop();
        assert!(state.should_stop());
    }

    #[test]
    fn expired_deadline_stops_search() {
        let state = SharedSearchState::with_timeout(Duration::ZERO);
        assert!(state.should_stop());
        let state = SharedSearchState::with_timeout(Duration::from_secs(3600));
        assert!(!state.should_stop());
    }

    #[test]
    fn shared_tt_store_and_probe() {
        let tt = SharedTranspositionTable::new_with_mb(4, 4);
        let key = PositionKey {
            key: 0xDEAD_BEEF_0000_1234,
            verify: 99,
        };
        tt.store(TTEntry::new(key, 4, 4242));
        assert_eq!(tt.probe(key, 4), Some(4242));
        assert_eq!(tt.probe(key, 3), None);
        assert_eq!(tt.len(), 1);

        let stats = tt.stats();
        assert_eq!(stats.stores, 1);
        assert_eq!(stats.hits, 1);

        tt.clear();
        assert!(tt.is_empty());
    }

    #[test]
    fn sharded_tt_stays_within_megabyte_budget() {
        let budget = 1usize << 20;
        let tt = SharedTranspositionTable::new_with_mb(1, 8);
        assert_eq!(tt.shards.len(), 8);
        assert!(tt.allocated_bytes() <= budget);

        let tt = SharedTranspositionTable::new_with_mb(3, 64);
        assert!(tt.allocated_bytes() <= 3 * budget);
    }
}
