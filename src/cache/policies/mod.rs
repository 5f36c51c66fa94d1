//! Line-replacement policies
//!
//! Each policy's bookkeeping lives on the owning [`Cache`](super::Cache) as
//! part of a [`ReplacementState`] value, dispatched by `match`. Victim
//! selection always prefers an invalid way; the policy only decides among
//! full sets.

mod fifo;
mod lfu;
mod lru;

pub use fifo::FifoState;
pub use lfu::LfuState;

use super::CacheSet;
use crate::types::CacheReplacementPolicy;

/// Per-cache replacement bookkeeping.
#[derive(Debug, Clone)]
pub enum ReplacementState {
    /// Per-set round-robin victim counters.
    Fifo(FifoState),
    /// Recency order lives in each set's `access_order`.
    Lru,
    /// Per-set per-way frequency counters.
    Lfu(LfuState),
}

impl ReplacementState {
    /// Fresh state for `policy` over `num_sets` sets of `associativity` ways.
    pub fn new(policy: CacheReplacementPolicy, num_sets: usize, associativity: usize) -> Self {
        match policy {
            CacheReplacementPolicy::Fifo => Self::Fifo(FifoState::new(num_sets)),
            CacheReplacementPolicy::Lru => Self::Lru,
            CacheReplacementPolicy::Lfu => Self::Lfu(LfuState::new(num_sets, associativity)),
        }
    }

    /// Update bookkeeping after a hit on `line_index`.
    pub fn on_hit(&mut self, set: &mut CacheSet, set_index: usize, line_index: usize) {
        match self {
            Self::Fifo(_) => {}
            Self::Lru => lru::touch(set, line_index),
            Self::Lfu(state) => state.record_access(set_index, line_index),
        }
    }

    /// Choose the way to overwrite in a full or partially filled set.
    pub fn select_victim(&mut self, set: &CacheSet, set_index: usize) -> usize {
        if let Some(invalid) = set.first_invalid() {
            return invalid;
        }
        match self {
            Self::Fifo(state) => state.next_victim(set_index, set.lines.len()),
            Self::Lru => lru::victim(set),
            Self::Lfu(state) => state.victim(set_index),
        }
    }

    /// Update bookkeeping after installing a line at `line_index`.
    pub fn on_install(&mut self, set: &mut CacheSet, set_index: usize, line_index: usize) {
        match self {
            Self::Fifo(_) => {}
            Self::Lru => lru::install(set, line_index),
            Self::Lfu(state) => state.reset(set_index, line_index),
        }
    }
}
