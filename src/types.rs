//! Common value types shared by every subsystem
//!
//! Addresses and sizes are 32-bit unsigned integers; process and block
//! identifiers are signed, with `-1` encoding "none".

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::MemoryError;

/// A physical or virtual byte address.
pub type Address = u32;

/// A size in bytes.
pub type Size = u32;

/// Process identifier. Negative values are reserved; [`NO_PROCESS`] means "none".
pub type ProcessId = i32;

/// Block identifier handed out by the contiguous allocator. For buddy
/// allocations the block's address doubles as its identifier.
pub type BlockId = i32;

/// Sentinel for "no owning process".
pub const NO_PROCESS: ProcessId = -1;

/// Sentinel for "no block".
pub const NO_BLOCK: BlockId = -1;

/// Whether a contiguous block is currently handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockStatus {
    /// Block is available for allocation.
    Free,
    /// Block belongs to a process.
    Allocated,
}

/// Free-block selection policy for the contiguous allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationStrategy {
    /// First free block large enough, in address order.
    FirstFit,
    /// Smallest free block large enough; ties go to the lower address.
    BestFit,
    /// Largest free block large enough; ties go to the lower address.
    WorstFit,
}

/// Page-replacement policy for the virtual-memory manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageReplacementPolicy {
    /// Evict the first allocated frame in index order.
    Fifo,
    /// Evict the least recently accessed page.
    Lru,
    /// Rotating-hand scan over the frame table.
    Clock,
}

/// Line-replacement policy for a cache level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheReplacementPolicy {
    /// Per-set round-robin victim counter.
    Fifo,
    /// Least recently used line.
    Lru,
    /// Least frequently used line.
    Lfu,
}

/// How the integrated system routes allocation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationMode {
    /// Power-of-two sizes go to the buddy allocator when it succeeds,
    /// everything else to the contiguous allocator.
    Auto,
    /// Always the buddy allocator.
    Buddy,
    /// Always the contiguous allocator.
    Physical,
    /// Always the buddy allocator, even for awkward sizes.
    Forced,
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstFit => write!(f, "FIRST_FIT"),
            Self::BestFit => write!(f, "BEST_FIT"),
            Self::WorstFit => write!(f, "WORST_FIT"),
        }
    }
}

impl FromStr for AllocationStrategy {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::FirstFit),
            "best" => Ok(Self::BestFit),
            "worst" => Ok(Self::WorstFit),
            other => Err(MemoryError::unknown_keyword("strategy", other)),
        }
    }
}

impl fmt::Display for PageReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifo => write!(f, "FIFO"),
            Self::Lru => write!(f, "LRU"),
            Self::Clock => write!(f, "CLOCK"),
        }
    }
}

impl FromStr for PageReplacementPolicy {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fifo" => Ok(Self::Fifo),
            "lru" => Ok(Self::Lru),
            "clock" => Ok(Self::Clock),
            other => Err(MemoryError::unknown_keyword("page policy", other)),
        }
    }
}

impl fmt::Display for CacheReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifo => write!(f, "FIFO"),
            Self::Lru => write!(f, "LRU"),
            Self::Lfu => write!(f, "LFU"),
        }
    }
}

impl FromStr for CacheReplacementPolicy {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fifo" => Ok(Self::Fifo),
            "lru" => Ok(Self::Lru),
            "lfu" => Ok(Self::Lfu),
            other => Err(MemoryError::unknown_keyword("cache policy", other)),
        }
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "AUTO"),
            Self::Buddy => write!(f, "BUDDY"),
            Self::Physical => write!(f, "PHYSICAL"),
            Self::Forced => write!(f, "FORCED"),
        }
    }
}

impl FromStr for AllocationMode {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "buddy" => Ok(Self::Buddy),
            "physical" => Ok(Self::Physical),
            "forced" => Ok(Self::Forced),
            other => Err(MemoryError::unknown_keyword("allocation mode", other)),
        }
    }
}

/// One extent in the contiguous allocator's partition, or a materialized
/// view of a buddy block.
///
/// Invariants: `size > 0`; a `Free` block has `owner == NO_PROCESS`; an
/// `Allocated` block has `requested_size <= size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryBlock {
    /// First byte of the extent.
    pub start: Address,
    /// Extent length in bytes.
    pub size: Size,
    /// Free or allocated.
    pub status: BlockStatus,
    /// Owning process, or [`NO_PROCESS`].
    pub owner: ProcessId,
    /// Stable identifier within the allocator.
    pub block_id: BlockId,
    /// Bytes the owner actually asked for (zero for free blocks).
    pub requested_size: Size,
}

impl MemoryBlock {
    /// A free block spanning `[start, start + size)`.
    pub fn free(start: Address, size: Size, block_id: BlockId) -> Self {
        Self {
            start,
            size,
            status: BlockStatus::Free,
            owner: NO_PROCESS,
            block_id,
            requested_size: 0,
        }
    }

    /// Whether the block is currently free.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.status == BlockStatus::Free
    }

    /// Exclusive end address of the extent.
    #[must_use]
    pub fn end(&self) -> Address {
        self.start + self.size
    }
}

/// An allocation request forwarded to either allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationRequest {
    /// Requested size in bytes.
    pub size: Size,
    /// Requesting process.
    pub pid: ProcessId,
}

impl AllocationRequest {
    /// Request `size` bytes on behalf of `pid`.
    pub fn new(size: Size, pid: ProcessId) -> Self {
        Self { size, pid }
    }
}

/// Outcome of an allocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationResult {
    /// Whether the request was satisfied.
    pub success: bool,
    /// Start address of the allocation (zero on failure).
    pub address: Address,
    /// Handle for later deallocation ([`NO_BLOCK`] on failure).
    pub block_id: BlockId,
}

impl AllocationResult {
    /// A successful allocation at `address` with handle `block_id`.
    pub fn success(address: Address, block_id: BlockId) -> Self {
        Self { success: true, address, block_id }
    }

    /// The canonical failure value: `{false, 0, -1}`.
    pub fn failure() -> Self {
        Self { success: false, address: 0, block_id: NO_BLOCK }
    }
}

/// Point-in-time statistics for an allocator.
///
/// `allocated_blocks` and `free_blocks` always reflect the *current* block
/// population, recomputed from live state rather than from the success
/// counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    /// Bytes under management.
    pub total_memory: Size,
    /// Bytes currently handed out.
    pub used_memory: Size,
    /// Bytes currently free.
    pub free_memory: Size,
    /// `1 - largest_free / total_free`, or zero with no free memory.
    pub fragmentation_ratio: f64,
    /// Blocks currently tracked.
    pub total_blocks: usize,
    /// Free blocks currently tracked.
    pub free_blocks: usize,
    /// Allocated blocks currently tracked.
    pub allocated_blocks: usize,
    /// Largest single free extent.
    pub largest_free_block: Size,
    /// Cumulative bytes granted beyond what was requested.
    pub internal_fragmentation: u64,
    /// Allocation requests seen, including failures.
    pub requests: u64,
    /// Requests satisfied.
    pub successes: u64,
    /// Requests rejected.
    pub failures: u64,
    /// `used_memory / total_memory`, or zero for an empty domain.
    pub utilization: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_result_is_canonical() {
        let result = AllocationResult::failure();
        assert!(!result.success);
        assert_eq!(result.address, 0);
        assert_eq!(result.block_id, NO_BLOCK);
    }

    #[test]
    fn free_block_has_no_owner() {
        let block = MemoryBlock::free(0, 1024, 0);
        assert!(block.is_free());
        assert_eq!(block.owner, NO_PROCESS);
        assert_eq!(block.end(), 1024);
    }

    #[test]
    fn strategy_keywords_parse() {
        assert_eq!("first".parse::<AllocationStrategy>().unwrap(), AllocationStrategy::FirstFit);
        assert_eq!("best".parse::<AllocationStrategy>().unwrap(), AllocationStrategy::BestFit);
        assert_eq!("worst".parse::<AllocationStrategy>().unwrap(), AllocationStrategy::WorstFit);
        assert!("next".parse::<AllocationStrategy>().is_err());
    }

    #[test]
    fn policy_keywords_parse() {
        assert_eq!("clock".parse::<PageReplacementPolicy>().unwrap(), PageReplacementPolicy::Clock);
        assert_eq!("lfu".parse::<CacheReplacementPolicy>().unwrap(), CacheReplacementPolicy::Lfu);
        assert_eq!("forced".parse::<AllocationMode>().unwrap(), AllocationMode::Forced);
        assert!("random".parse::<PageReplacementPolicy>().is_err());
    }

    #[test]
    fn mode_display_matches_prompt_tokens() {
        assert_eq!(AllocationMode::Auto.to_string(), "AUTO");
        assert_eq!(PageReplacementPolicy::Lru.to_string(), "LRU");
        assert_eq!(AllocationStrategy::BestFit.to_string(), "BEST_FIT");
    }
}
