//! Inclusive three-level cache hierarchy
//!
//! Probes L1 → L2 → L3 and stops at the first hit. A probe miss installs
//! the line at that level before the next level is consulted, so after a
//! total miss every level holds the line without any re-probing; counters
//! therefore see each request at most once per level.
//!
//! Hit counters here are per *request*: `l1_hits` counts requests satisfied
//! at L1, `l2_hits` those satisfied at L2, and so on. The per-level
//! [`CacheStats`] remain probe-level (L2 only ever sees L1 misses).

use serde::Serialize;
use tracing::trace;

use crate::config::CacheHierarchyConfig;
use crate::error::Result;
use crate::types::{Address, ProcessId};

use super::{Cache, CacheStats};

/// Fixed access-time weights in cycles.
const L1_TIME: f64 = 1.0;
const L2_TIME: f64 = 10.0;
const L3_TIME: f64 = 50.0;
const MAIN_MEMORY_TIME: f64 = 200.0;

/// Snapshot of hierarchy-level counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HierarchyStats {
    /// Probe-level counters for L1.
    pub l1: CacheStats,
    /// Probe-level counters for L2.
    pub l2: CacheStats,
    /// Probe-level counters for L3.
    pub l3: CacheStats,
    /// Requests issued to the hierarchy.
    pub total_accesses: u64,
    /// Requests satisfied at L1.
    pub l1_hits: u64,
    /// Requests satisfied at L2.
    pub l2_hits: u64,
    /// Requests satisfied at L3.
    pub l3_hits: u64,
    /// Requests that fell through to main memory.
    pub main_memory_accesses: u64,
    /// Average memory access time in cycles, weighted 1/10/50/200.
    pub avg_access_time: f64,
}

/// Three inclusive cache levels sharing one line size.
#[derive(Debug, Clone)]
pub struct CacheHierarchy {
    l1: Cache,
    l2: Cache,
    l3: Cache,
    total_accesses: u64,
    l1_hits: u64,
    l2_hits: u64,
    l3_hits: u64,
    main_memory_accesses: u64,
}

impl CacheHierarchy {
    /// Build the hierarchy described by `config`.
    pub fn new(config: &CacheHierarchyConfig) -> Result<Self> {
        Ok(Self {
            l1: Cache::new(
                config.l1_size,
                config.line_size,
                config.l1_associativity,
                config.l1_policy,
            )?,
            l2: Cache::new(
                config.l2_size,
                config.line_size,
                config.l2_associativity,
                config.l2_policy,
            )?,
            l3: Cache::new(
                config.l3_size,
                config.line_size,
                config.l3_associativity,
                config.l3_policy,
            )?,
            total_accesses: 0,
            l1_hits: 0,
            l2_hits: 0,
            l3_hits: 0,
            main_memory_accesses: 0,
        })
    }

    /// The L1 cache.
    #[must_use]
    pub fn l1(&self) -> &Cache {
        &self.l1
    }

    /// The L2 cache.
    #[must_use]
    pub fn l2(&self) -> &Cache {
        &self.l2
    }

    /// The L3 cache.
    #[must_use]
    pub fn l3(&self) -> &Cache {
        &self.l3
    }

    /// Read through the hierarchy. Returns true iff any level hit.
    pub fn read(&mut self, address: Address, pid: ProcessId) -> bool {
        self.total_accesses += 1;

        if self.l1.read(address, pid) {
            self.l1_hits += 1;
            return true;
        }
        if self.l2.read(address, pid) {
            self.l2_hits += 1;
            return true;
        }
        if self.l3.read(address, pid) {
            self.l3_hits += 1;
            return true;
        }

        self.main_memory_accesses += 1;
        trace!(address, "read fell through to main memory");
        false
    }

    /// Write through the hierarchy. Hits dirty the line where it resides;
    /// a total miss installs dirty lines at every level.
    pub fn write(&mut self, address: Address, pid: ProcessId) -> bool {
        self.total_accesses += 1;

        if self.l1.write(address, pid) {
            self.l1_hits += 1;
            return true;
        }
        if self.l2.write(address, pid) {
            self.l2_hits += 1;
            return true;
        }
        if self.l3.write(address, pid) {
            self.l3_hits += 1;
            return true;
        }

        self.main_memory_accesses += 1;
        trace!(address, "write fell through to main memory");
        false
    }

    /// Counter snapshot including the access-time estimate.
    #[must_use]
    pub fn stats(&self) -> HierarchyStats {
        HierarchyStats {
            l1: self.l1.stats(),
            l2: self.l2.stats(),
            l3: self.l3.stats(),
            total_accesses: self.total_accesses,
            l1_hits: self.l1_hits,
            l2_hits: self.l2_hits,
            l3_hits: self.l3_hits,
            main_memory_accesses: self.main_memory_accesses,
            avg_access_time: self.average_access_time(),
        }
    }

    /// Zero every counter at every level, leaving contents intact.
    pub fn reset_stats(&mut self) {
        self.l1.reset_stats();
        self.l2.reset_stats();
        self.l3.reset_stats();
        self.total_accesses = 0;
        self.l1_hits = 0;
        self.l2_hits = 0;
        self.l3_hits = 0;
        self.main_memory_accesses = 0;
    }

    /// AMAT over all requests, weighted by where each was satisfied.
    fn average_access_time(&self) -> f64 {
        if self.total_accesses == 0 {
            return 0.0;
        }
        let total_time = self.l1_hits as f64 * L1_TIME
            + self.l2_hits as f64 * L2_TIME
            + self.l3_hits as f64 * L3_TIME
            + self.main_memory_accesses as f64 * MAIN_MEMORY_TIME;
        total_time / self.total_accesses as f64
    }
}
