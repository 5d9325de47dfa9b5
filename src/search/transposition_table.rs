//! Bucketed table of perft subtree counts keyed by position hash.
//!
//! - 4-way set-associative buckets.
//! - A hit requires the primary key, the verification key and the remaining
//!   depth to match.
//! - Depth-preferred replacement: a full bucket gives up its shallowest
//!   entry, and only to an entry at least as deep.

use crate::search::zobrist::PositionKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTEntry {
    pub key: u64,
    pub verify: u64,
    pub depth: u8,
    pub count: u64,
}

impl TTEntry {
    #[inline]
    pub fn new(key: PositionKey, depth: u8, count: u64) -> Self {
        Self {
            key: key.key,
            verify: key.verify,
            depth,
            count,
        }
    }

    #[inline]
    fn matches(&self, key: PositionKey, depth: u8) -> bool {
        self.key == key.key && self.verify == key.verify && self.depth == depth
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TTStats {
    pub probes: u64,
    pub hits: u64,
    pub stores: u64,
}

#[derive(Debug, Clone)]
pub struct TranspositionTable {
    buckets: Vec<[Option<TTEntry>; Self::BUCKET_SIZE]>,
    bucket_mask: usize,
    stats: TTStats,
}

impl TranspositionTable {
    const BUCKET_SIZE: usize = 4;

    pub fn new_with_mb(size_mb: usize) -> Self {
        Self::new_with_bytes(size_mb.max(1) << 20)
    }

    /// Largest power-of-two bucket count that fits in `bytes`, at least one.
    pub fn new_with_bytes(bytes: usize) -> Self {
        let bucket_size = std::mem::size_of::<[Option<TTEntry>; Self::BUCKET_SIZE]>().max(1);
        let raw_bucket_count = (bytes / bucket_size).max(1);
        // Round down so the table stays within budget.
        let bucket_count = if raw_bucket_count.is_power_of_two() {
            raw_bucket_count
        } else {
            raw_bucket_count.next_power_of_two() / 2
        };
        Self {
            buckets: vec![[None; Self::BUCKET_SIZE]; bucket_count],
            bucket_mask: bucket_count - 1,
            stats: TTStats::default(),
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.buckets.fill([None; Self::BUCKET_SIZE]);
        self.stats = TTStats::default();
    }

    /// Slot capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buckets.len() * Self::BUCKET_SIZE
    }

    /// Bytes held by the slot array.
    #[inline]
    pub fn allocated_bytes(&self) -> usize {
        self.capacity() * std::mem::size_of::<Option<TTEntry>>()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.buckets
            .iter()
            .map(|b| b.iter().filter(|s| s.is_some()).count())
            .sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn stats(&self) -> TTStats {
        self.stats
    }

    #[inline]
    fn bucket_idx(&self, key: u64) -> usize {
        (key as usize) & self.bucket_mask
    }

    pub fn probe(&mut self, key: PositionKey, depth: u8) -> Option<u64> {
        self.stats.probes += 1;
        let b = self.bucket_idx(key.key);
        let hit = self.buckets[b]
            .iter()
            .flatten()
            .find(|e| e.matches(key, depth))
            .map(|e| e.count);
        if hit.is_some() {
            self.stats.hits += 1;
        }
        hit
    }

    pub fn store(&mut self, entry: TTEntry) {
        self.stats.stores += 1;
        let b = self.bucket_idx(entry.key);
        let bucket = &mut self.buckets[b];

        let key = PositionKey {
            key: entry.key,
            verify: entry.verify,
        };
        if let Some(slot) = bucket
            .iter_mut()
            .find(|s| s.is_some_and(|e| e.matches(key, entry.depth)))
        {
            *slot = Some(entry);
            return;
        }
        if let Some(slot) = bucket.iter_mut().find(|s| s.is_none()) {
            *slot = Some(entry);
            return;
        }

        let mut victim = 0usize;
        let mut victim_depth = u8::MAX;
        for (i, slot) in bucket.iter().enumerate() {
            if let Some(existing) = slot {
                if existing.depth < victim_depth {
                    victim_depth = existing.depth;
                    victim = i;
                }
            }
        }
        if entry.depth >= victim_depth {
            bucket[victim] = Some(entry);
        }
    }
}
