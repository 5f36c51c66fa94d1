//! # memsim
//!
//! An educational simulator of a complete memory-management stack:
//!
//! - contiguous physical allocation with first-, best-, and worst-fit
//!   placement, splitting, and coalescing;
//! - a power-of-two buddy allocator with recursive buddy merging;
//! - a demand-paged virtual-memory manager with FIFO, LRU, and CLOCK
//!   page replacement;
//! - a three-level inclusive set-associative cache hierarchy with FIFO,
//!   LRU, and LFU line replacement;
//! - an integration layer that routes per-process allocation and access
//!   traffic through all of the above.
//!
//! Everything is single-threaded and deterministic: identical input traces
//! produce identical counter states, which is what makes the simulator
//! usable for teaching and for property tests.
//!
//! ## Quick start
//!
//! ```
//! use memsim::config::SimulatorConfig;
//! use memsim::system::IntegratedMemorySystem;
//!
//! let mut system = IntegratedMemorySystem::new(SimulatorConfig::default())?;
//! system.create_process(1);
//! let allocation = system.allocate(1, 4096);
//! assert!(allocation.success);
//! system.access(1, allocation.address, false);
//! # Ok::<(), memsim::error::MemoryError>(())
//! ```
//!
//! The `memsim` binary wraps this library in an interactive shell; see the
//! `help` command for the full surface.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod allocator;
pub mod buddy;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod stats;
pub mod system;
pub mod types;
pub mod utils;
pub mod vmm;

pub use crate::error::{MemoryError, Result};

/// Convenient re-exports of the types most callers need.
pub mod prelude {
    pub use crate::allocator::ContiguousAllocator;
    pub use crate::buddy::BuddyAllocator;
    pub use crate::cache::{Cache, CacheHierarchy};
    pub use crate::config::{CacheHierarchyConfig, SimulatorConfig};
    pub use crate::error::{MemoryError, Result};
    pub use crate::stats::{ExportFormat, SystemStats};
    pub use crate::system::{AllocatorTag, IntegratedMemorySystem, ProcessAllocation};
    pub use crate::types::{
        Address, AllocationMode, AllocationRequest, AllocationResult, AllocationStrategy,
        BlockId, BlockStatus, CacheReplacementPolicy, MemoryBlock, MemoryStats,
        PageReplacementPolicy, ProcessId, Size, NO_BLOCK, NO_PROCESS,
    };
    pub use crate::vmm::{PageTable, VirtualMemoryManager, VmmStats};
}
