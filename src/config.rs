//! Simulator configuration
//!
//! Startup parameters for the integrated system, with validation and a
//! fluent builder. Invalid combinations are rejected before any subsystem
//! is constructed, so a running simulator never observes them.

use crate::error::{MemoryError, Result};
use crate::types::{AllocationStrategy, CacheReplacementPolicy, PageReplacementPolicy, Size};

/// Default physical memory: 1 MiB.
pub const DEFAULT_TOTAL_MEMORY: Size = 1024 * 1024;

/// Default page size: 4 KiB.
pub const DEFAULT_PAGE_SIZE: Size = 4096;

/// Top-level simulator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Physical memory managed by the allocators and the VMM.
    pub total_memory: Size,
    /// Page size for the virtual-memory manager.
    pub page_size: Size,
    /// Initial contiguous-allocator strategy.
    pub strategy: AllocationStrategy,
    /// Initial page-replacement policy.
    pub page_policy: PageReplacementPolicy,
    /// Cache hierarchy geometry.
    pub cache: CacheHierarchyConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            total_memory: DEFAULT_TOTAL_MEMORY,
            page_size: DEFAULT_PAGE_SIZE,
            strategy: AllocationStrategy::FirstFit,
            page_policy: PageReplacementPolicy::Lru,
            cache: CacheHierarchyConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a configuration.
    pub fn builder() -> SimulatorConfigBuilder {
        SimulatorConfigBuilder::default()
    }

    /// Check every construction precondition up front.
    pub fn validate(&self) -> Result<()> {
        if self.total_memory == 0 {
            return Err(MemoryError::zero_size("total memory"));
        }
        if self.page_size == 0 {
            return Err(MemoryError::zero_size("page size"));
        }
        if self.total_memory % self.page_size != 0 {
            return Err(MemoryError::not_divisible(
                "physical memory by page size",
                self.total_memory,
                self.page_size,
            ));
        }
        self.cache.validate()
    }
}

/// Geometry and policies for the three inclusive cache levels.
///
/// Defaults match a small desktop part: 32 KiB / 256 KiB / 2 MiB with
/// 64-byte lines and LRU at every level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHierarchyConfig {
    /// L1 capacity in bytes.
    pub l1_size: Size,
    /// L2 capacity in bytes.
    pub l2_size: Size,
    /// L3 capacity in bytes.
    pub l3_size: Size,
    /// Line size shared by all levels.
    pub line_size: Size,
    /// L1 ways per set.
    pub l1_associativity: usize,
    /// L2 ways per set.
    pub l2_associativity: usize,
    /// L3 ways per set.
    pub l3_associativity: usize,
    /// L1 line-replacement policy.
    pub l1_policy: CacheReplacementPolicy,
    /// L2 line-replacement policy.
    pub l2_policy: CacheReplacementPolicy,
    /// L3 line-replacement policy.
    pub l3_policy: CacheReplacementPolicy,
}

impl Default for CacheHierarchyConfig {
    fn default() -> Self {
        Self {
            l1_size: 32 * 1024,
            l2_size: 256 * 1024,
            l3_size: 2 * 1024 * 1024,
            line_size: 64,
            l1_associativity: 8,
            l2_associativity: 16,
            l3_associativity: 16,
            l1_policy: CacheReplacementPolicy::Lru,
            l2_policy: CacheReplacementPolicy::Lru,
            l3_policy: CacheReplacementPolicy::Lru,
        }
    }
}

impl CacheHierarchyConfig {
    /// Check per-level size, line, and associativity constraints.
    pub fn validate(&self) -> Result<()> {
        for (size, assoc) in [
            (self.l1_size, self.l1_associativity),
            (self.l2_size, self.l2_associativity),
            (self.l3_size, self.l3_associativity),
        ] {
            if size == 0 {
                return Err(MemoryError::zero_size("cache size"));
            }
            if self.line_size == 0 {
                return Err(MemoryError::zero_size("cache line size"));
            }
            if assoc == 0 {
                return Err(MemoryError::zero_size("cache associativity"));
            }
            let set_bytes = self.line_size * assoc as Size;
            if size % set_bytes != 0 {
                return Err(MemoryError::not_divisible(
                    "cache size by line size times associativity",
                    size,
                    set_bytes,
                ));
            }
        }
        Ok(())
    }
}

/// Fluent builder for [`SimulatorConfig`].
#[derive(Debug, Default)]
pub struct SimulatorConfigBuilder {
    config: SimulatorConfig,
}

impl SimulatorConfigBuilder {
    /// Set the physical memory size.
    pub fn total_memory(mut self, bytes: Size) -> Self {
        self.config.total_memory = bytes;
        self
    }

    /// Set the page size.
    pub fn page_size(mut self, bytes: Size) -> Self {
        self.config.page_size = bytes;
        self
    }

    /// Set the contiguous-allocator strategy.
    pub fn strategy(mut self, strategy: AllocationStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Set the page-replacement policy.
    pub fn page_policy(mut self, policy: PageReplacementPolicy) -> Self {
        self.config.page_policy = policy;
        self
    }

    /// Replace the cache geometry wholesale.
    pub fn cache(mut self, cache: CacheHierarchyConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Validate and return the finished configuration.
    pub fn build(self) -> Result<SimulatorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
