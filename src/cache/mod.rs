//! Set-associative cache storage
//!
//! A [`Cache`] splits its capacity into `size / (line_size * associativity)`
//! sets. Lookups scan the target set for a valid line with the right tag;
//! a miss installs the line immediately, evicting the first invalid slot or
//! the victim chosen by the configured replacement policy.
//!
//! Address decoding: `line_address = addr / line_size`, `set_index =
//! line_address % num_sets`, `tag = line_address / num_sets`.

pub mod hierarchy;
pub mod policies;

pub use hierarchy::{CacheHierarchy, HierarchyStats};

use std::collections::VecDeque;

use serde::Serialize;
use tracing::trace;

use crate::error::{MemoryError, Result};
use crate::types::{Address, CacheReplacementPolicy, ProcessId, Size, NO_PROCESS};

use policies::ReplacementState;

/// One cache line.
#[derive(Debug, Clone)]
pub struct CacheLine {
    /// Tag of the resident line (meaningless while invalid).
    pub tag: Address,
    /// Whether the slot holds data.
    pub valid: bool,
    /// Set when the line was written since installation.
    pub dirty: bool,
    /// Process that installed the line. Tag matching does not key on this,
    /// so it may go stale after the process dies; replacement reclaims the
    /// line normally.
    pub owner: ProcessId,
}

impl CacheLine {
    fn empty() -> Self {
        Self { tag: 0, valid: false, dirty: false, owner: NO_PROCESS }
    }
}

/// One set: `associativity` lines plus the LRU access order
/// (most-recent at the front, valid lines only).
#[derive(Debug, Clone)]
pub struct CacheSet {
    /// The ways of this set.
    pub lines: Vec<CacheLine>,
    /// Line indices ordered by recency, most recent first.
    pub access_order: VecDeque<usize>,
}

impl CacheSet {
    fn new(associativity: usize) -> Self {
        Self {
            lines: vec![CacheLine::empty(); associativity],
            access_order: VecDeque::with_capacity(associativity),
        }
    }

    /// Index of the first invalid way, if any.
    #[must_use]
    pub fn first_invalid(&self) -> Option<usize> {
        self.lines.iter().position(|line| !line.valid)
    }
}

/// Hit and miss counters for one cache level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Probes that found the line.
    pub hits: u64,
    /// Probes that missed.
    pub misses: u64,
    /// Total probes.
    pub accesses: u64,
    /// `hits / accesses`, or zero without probes.
    pub hit_rate: f64,
    /// `misses / accesses`, or zero without probes.
    pub miss_rate: f64,
}

/// A single set-associative cache level.
#[derive(Debug, Clone)]
pub struct Cache {
    size: Size,
    line_size: Size,
    associativity: usize,
    num_sets: usize,
    policy: CacheReplacementPolicy,
    replacement: ReplacementState,
    sets: Vec<CacheSet>,
    hits: u64,
    misses: u64,
    accesses: u64,
}

impl Cache {
    /// Build a cache of `size` bytes with `line_size`-byte lines and
    /// `associativity` ways per set.
    ///
    /// All parameters must be positive and `line_size * associativity`
    /// must divide `size` evenly.
    pub fn new(
        size: Size,
        line_size: Size,
        associativity: usize,
        policy: CacheReplacementPolicy,
    ) -> Result<Self> {
        if size == 0 {
            return Err(MemoryError::zero_size("cache size"));
        }
        if line_size == 0 {
            return Err(MemoryError::zero_size("cache line size"));
        }
        if associativity == 0 {
            return Err(MemoryError::zero_size("cache associativity"));
        }
        let set_bytes = line_size * associativity as Size;
        if size % set_bytes != 0 {
            return Err(MemoryError::not_divisible(
                "cache size by line size times associativity",
                size,
                set_bytes,
            ));
        }

        let num_sets = (size / set_bytes) as usize;
        Ok(Self {
            size,
            line_size,
            associativity,
            num_sets,
            policy,
            replacement: ReplacementState::new(policy, num_sets, associativity),
            sets: (0..num_sets).map(|_| CacheSet::new(associativity)).collect(),
            hits: 0,
            misses: 0,
            accesses: 0,
        })
    }

    /// Capacity in bytes.
    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    /// Line size in bytes.
    #[must_use]
    pub fn line_size(&self) -> Size {
        self.line_size
    }

    /// Ways per set.
    #[must_use]
    pub fn associativity(&self) -> usize {
        self.associativity
    }

    /// Number of sets.
    #[must_use]
    pub fn num_sets(&self) -> usize {
        self.num_sets
    }

    /// Replacement policy in effect.
    #[must_use]
    pub fn policy(&self) -> CacheReplacementPolicy {
        self.policy
    }

    /// The sets, for inspection and dumps.
    #[must_use]
    pub fn sets(&self) -> &[CacheSet] {
        &self.sets
    }

    /// Probe for a read. On a miss the line is installed clean.
    pub fn read(&mut self, address: Address, pid: ProcessId) -> bool {
        self.probe(address, pid, false)
    }

    /// Probe for a write. A hit marks the line dirty; a miss installs it
    /// dirty.
    pub fn write(&mut self, address: Address, pid: ProcessId) -> bool {
        self.probe(address, pid, true)
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let (hit_rate, miss_rate) = if self.accesses > 0 {
            (
                self.hits as f64 / self.accesses as f64,
                self.misses as f64 / self.accesses as f64,
            )
        } else {
            (0.0, 0.0)
        };
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            accesses: self.accesses,
            hit_rate,
            miss_rate,
        }
    }

    /// Zero the counters, leaving contents intact.
    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.accesses = 0;
    }

    fn probe(&mut self, address: Address, pid: ProcessId, is_write: bool) -> bool {
        self.accesses += 1;
        let (set_index, tag) = self.decode(address);

        if let Some(line_index) = self.find_line(set_index, tag) {
            self.hits += 1;
            if is_write {
                self.sets[set_index].lines[line_index].dirty = true;
            }
            self.replacement.on_hit(&mut self.sets[set_index], set_index, line_index);
            return true;
        }

        self.misses += 1;
        self.install(set_index, tag, pid, is_write);
        false
    }

    /// Decode an address into `(set_index, tag)`.
    fn decode(&self, address: Address) -> (usize, Address) {
        let line_address = address / self.line_size;
        let set_index = (line_address as usize) % self.num_sets;
        let tag = line_address / self.num_sets as Address;
        (set_index, tag)
    }

    fn find_line(&self, set_index: usize, tag: Address) -> Option<usize> {
        self.sets[set_index]
            .lines
            .iter()
            .position(|line| line.valid && line.tag == tag)
    }

    /// Overwrite the victim way with the new line.
    fn install(&mut self, set_index: usize, tag: Address, pid: ProcessId, dirty: bool) {
        let victim = self.replacement.select_victim(&self.sets[set_index], set_index);
        trace!(set_index, tag, victim, "cache line install");

        let line = &mut self.sets[set_index].lines[victim];
        line.tag = tag;
        line.valid = true;
        line.dirty = dirty;
        line.owner = pid;

        self.replacement.on_install(&mut self.sets[set_index], set_index, victim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny(policy: CacheReplacementPolicy, ways: usize) -> Cache {
        // One set with `ways` 64-byte lines.
        Cache::new(64 * ways as Size, 64, ways, policy).unwrap()
    }

    fn assert_unique_tags(cache: &Cache) {
        for set in cache.sets() {
            let mut tags: Vec<Address> =
                set.lines.iter().filter(|l| l.valid).map(|l| l.tag).collect();
            tags.sort_unstable();
            let len = tags.len();
            tags.dedup();
            assert_eq!(len, tags.len(), "duplicate valid tag within a set");
        }
    }

    #[test]
    fn construction_validates_geometry() {
        assert!(Cache::new(0, 64, 8, CacheReplacementPolicy::Lru).is_err());
        assert!(Cache::new(1024, 0, 8, CacheReplacementPolicy::Lru).is_err());
        assert!(Cache::new(1024, 64, 0, CacheReplacementPolicy::Lru).is_err());
        assert!(Cache::new(1000, 64, 8, CacheReplacementPolicy::Lru).is_err());
        let cache = Cache::new(32 * 1024, 64, 8, CacheReplacementPolicy::Lru).unwrap();
        assert_eq!(cache.num_sets(), 64);
    }

    #[test]
    fn decode_splits_offset_set_and_tag() {
        let cache = Cache::new(64 * 4, 64, 2, CacheReplacementPolicy::Lru).unwrap();
        // Two sets: line addresses alternate between them.
        assert_eq!(cache.decode(0), (0, 0));
        assert_eq!(cache.decode(63), (0, 0));
        assert_eq!(cache.decode(64), (1, 0));
        assert_eq!(cache.decode(128), (0, 1));
    }

    #[test]
    fn miss_installs_then_hits() {
        let mut cache = tiny(CacheReplacementPolicy::Lru, 2);
        assert!(!cache.read(0, 1));
        assert!(cache.read(0, 1));

        let stats = cache.stats();
        assert_eq!(stats.accesses, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn write_hit_marks_dirty() {
        let mut cache = tiny(CacheReplacementPolicy::Lru, 2);
        assert!(!cache.read(0, 1));
        assert!(cache.write(0, 1));
        assert!(cache.sets()[0].lines.iter().any(|l| l.valid && l.dirty));
    }

    #[test]
    fn write_miss_installs_dirty() {
        let mut cache = tiny(CacheReplacementPolicy::Lru, 2);
        assert!(!cache.write(0, 1));
        let line = &cache.sets()[0].lines[0];
        assert!(line.valid && line.dirty);
    }

    #[test]
    fn fifo_counter_round_robins_after_fill() {
        let mut cache = tiny(CacheReplacementPolicy::Fifo, 2);
        assert!(!cache.read(0, 1)); // line 0
        assert!(!cache.read(64, 1)); // line 1
        assert!(!cache.read(128, 1)); // victim line 0
        assert!(cache.read(64, 1)); // survived

        assert_eq!(cache.sets()[0].lines[0].tag, 2);
        assert_eq!(cache.sets()[0].lines[1].tag, 1);
        assert_unique_tags(&cache);
    }

    #[test]
    fn lru_evicts_least_recent_line() {
        let mut cache = tiny(CacheReplacementPolicy::Lru, 2);
        cache.read(0, 1); // tags 0
        cache.read(64, 1); // tags 1
        cache.read(0, 1); // refresh tag 0
        cache.read(128, 1); // evicts tag 1

        assert!(cache.read(0, 1), "tag 0 must survive");
        assert!(!cache.read(64, 1), "tag 1 must have been evicted");
        assert_unique_tags(&cache);
    }

    #[test]
    fn lfu_evicts_least_frequent_line() {
        let mut cache = tiny(CacheReplacementPolicy::Lfu, 2);
        cache.read(0, 1); // tag 0, count 1
        cache.read(64, 1); // tag 1, count 1
        cache.read(0, 1); // tag 0, count 2
        cache.read(0, 1); // tag 0, count 3
        cache.read(128, 1); // evicts tag 1 (count 1)

        assert!(cache.read(0, 1));
        assert!(!cache.read(64, 1));
    }

    #[test]
    fn lfu_ties_break_to_lowest_index() {
        let mut cache = tiny(CacheReplacementPolicy::Lfu, 2);
        cache.read(0, 1); // line 0, count 1
        cache.read(64, 1); // line 1, count 1
        cache.read(128, 1); // tie at count 1: victim line 0

        assert_eq!(cache.sets()[0].lines[0].tag, 2);
        assert_eq!(cache.sets()[0].lines[1].tag, 1);
    }

    #[test]
    fn invalid_slots_take_priority_over_policy_victims() {
        let mut cache = tiny(CacheReplacementPolicy::Fifo, 4);
        cache.read(0, 1);
        cache.read(64, 1);
        // Two ways still invalid; the next two misses must use them and
        // leave the first two lines alone.
        cache.read(128, 1);
        cache.read(192, 1);

        let tags: Vec<Address> = cache.sets()[0].lines.iter().map(|l| l.tag).collect();
        assert_eq!(tags, vec![0, 1, 2, 3]);
    }

    #[test]
    fn reset_stats_preserves_contents() {
        let mut cache = tiny(CacheReplacementPolicy::Lru, 2);
        cache.read(0, 1);
        cache.reset_stats();

        assert_eq!(cache.stats().accesses, 0);
        assert!(cache.read(0, 1), "contents must survive a stats reset");
    }
}
