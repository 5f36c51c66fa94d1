//! Power-of-two buddy allocator
//!
//! Blocks live on per-order free lists; order `k` holds blocks of `2^k`
//! bytes. Allocation rounds the request up to the next power of two and
//! splits a larger block down to the required order. Deallocation merges a
//! freed block with its buddy (`address XOR 2^k`) as long as the buddy is
//! free, so after every operation no two buddies coexist on the same list.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, trace};

use crate::error::{MemoryError, Result};
use crate::types::{
    Address, AllocationRequest, AllocationResult, BlockId, BlockStatus, MemoryBlock, MemoryStats,
    ProcessId, Size,
};

/// Buddy allocator over a power-of-two domain.
///
/// The allocated block's address doubles as its identifier.
#[derive(Debug, Clone)]
pub struct BuddyAllocator {
    total_memory: Size,
    max_order: u32,
    free_lists: Vec<VecDeque<Address>>,
    allocated: BTreeMap<Address, (u32, ProcessId)>,
    requests: u64,
    successes: u64,
    failures: u64,
    internal_fragmentation: u64,
}

impl BuddyAllocator {
    /// Build an allocator over `total_memory` bytes.
    ///
    /// Fails unless `total_memory` is a positive power of two.
    pub fn new(total_memory: Size) -> Result<Self> {
        if total_memory == 0 {
            return Err(MemoryError::zero_size("buddy domain"));
        }
        if !total_memory.is_power_of_two() {
            return Err(MemoryError::not_power_of_two(total_memory));
        }

        let max_order = total_memory.trailing_zeros();
        let mut allocator = Self {
            total_memory,
            max_order,
            free_lists: Vec::new(),
            allocated: BTreeMap::new(),
            requests: 0,
            successes: 0,
            failures: 0,
            internal_fragmentation: 0,
        };
        allocator.initialize();
        Ok(allocator)
    }

    /// Reset to a single maximal free block and clear all counters.
    pub fn initialize(&mut self) {
        self.free_lists = vec![VecDeque::new(); self.max_order as usize + 1];
        self.free_lists[self.max_order as usize].push_back(0);
        self.allocated.clear();
        self.requests = 0;
        self.successes = 0;
        self.failures = 0;
        self.internal_fragmentation = 0;
    }

    /// Bytes under management.
    #[must_use]
    pub fn total_memory(&self) -> Size {
        self.total_memory
    }

    /// Largest order (the whole domain).
    #[must_use]
    pub fn max_order(&self) -> u32 {
        self.max_order
    }

    /// Free addresses at `order`, in list order.
    #[must_use]
    pub fn free_list(&self, order: u32) -> &VecDeque<Address> {
        &self.free_lists[order as usize]
    }

    /// Satisfy `request`, rounding its size up to the next power of two.
    pub fn allocate(&mut self, request: AllocationRequest) -> AllocationResult {
        self.requests += 1;
        if request.size == 0 || request.size > self.total_memory {
            self.failures += 1;
            return AllocationResult::failure();
        }

        let actual_size = request.size.next_power_of_two();
        let order = actual_size.trailing_zeros();

        // Smallest order >= `order` with a free block.
        let Some(mut source) = (order..=self.max_order)
            .find(|&k| !self.free_lists[k as usize].is_empty())
        else {
            self.failures += 1;
            debug!(size = request.size, pid = request.pid, "buddy allocation failed: no free block");
            return AllocationResult::failure();
        };

        while source > order {
            self.split_block(source);
            source -= 1;
        }

        // The split loop leaves at least one block at the target order.
        let Some(address) = self.free_lists[order as usize].pop_front() else {
            self.failures += 1;
            return AllocationResult::failure();
        };
        self.allocated.insert(address, (order, request.pid));
        self.successes += 1;
        self.internal_fragmentation += u64::from(actual_size - request.size);

        trace!(address, order, pid = request.pid, "buddy allocation");
        AllocationResult::success(address, address as BlockId)
    }

    /// Release the block at `address`, merging buddies upward as far as
    /// possible. Returns false when `address` is not an allocated block.
    pub fn deallocate(&mut self, address: Address) -> bool {
        let Some((order, _pid)) = self.allocated.remove(&address) else {
            return false;
        };
        trace!(address, order, "buddy deallocation");
        self.merge_buddies(order, address);
        true
    }

    /// Snapshot of counters and free-list occupancy.
    #[must_use]
    pub fn stats(&self) -> MemoryStats {
        let used: u64 = self.allocated.values().map(|&(order, _)| 1u64 << order).sum();
        let used = used as Size;
        let free = self.total_memory - used;

        let mut free_blocks = 0;
        let mut largest_free = 0;
        for order in 0..=self.max_order {
            let list = &self.free_lists[order as usize];
            free_blocks += list.len();
            if !list.is_empty() {
                largest_free = largest_free.max(Self::block_size(order));
            }
        }

        let fragmentation_ratio = if free > 0 {
            1.0 - f64::from(largest_free) / f64::from(free)
        } else {
            0.0
        };
        let utilization = if self.total_memory > 0 {
            f64::from(used) / f64::from(self.total_memory)
        } else {
            0.0
        };

        MemoryStats {
            total_memory: self.total_memory,
            used_memory: used,
            free_memory: free,
            fragmentation_ratio,
            total_blocks: self.allocated.len() + free_blocks,
            free_blocks,
            allocated_blocks: self.allocated.len(),
            largest_free_block: largest_free,
            internal_fragmentation: self.internal_fragmentation,
            requests: self.requests,
            successes: self.successes,
            failures: self.failures,
            utilization,
        }
    }

    /// Materialized view of all allocated blocks, by address.
    #[must_use]
    pub fn allocated_blocks(&self) -> Vec<MemoryBlock> {
        self.allocated
            .iter()
            .map(|(&address, &(order, pid))| MemoryBlock {
                start: address,
                size: Self::block_size(order),
                status: BlockStatus::Allocated,
                owner: pid,
                block_id: address as BlockId,
                requested_size: Self::block_size(order),
            })
            .collect()
    }

    /// Materialized view of all free blocks, by order then list position.
    #[must_use]
    pub fn free_blocks(&self) -> Vec<MemoryBlock> {
        let mut blocks = Vec::new();
        for order in 0..=self.max_order {
            let size = Self::block_size(order);
            for &address in &self.free_lists[order as usize] {
                blocks.push(MemoryBlock::free(address, size, address as BlockId));
            }
        }
        blocks
    }

    fn block_size(order: u32) -> Size {
        1 << order
    }

    fn buddy_address(address: Address, order: u32) -> Address {
        address ^ Self::block_size(order)
    }

    /// Split the head block of `order` into two buddies one order down.
    fn split_block(&mut self, order: u32) {
        debug_assert!(order > 0);
        let Some(address) = self.free_lists[order as usize].pop_front() else {
            return;
        };
        let half = Self::block_size(order - 1);
        let lower = &mut self.free_lists[order as usize - 1];
        lower.push_back(address);
        lower.push_back(address + half);
    }

    /// Push `address` back at `order`, absorbing its buddy recursively
    /// whenever the buddy is also free.
    fn merge_buddies(&mut self, order: u32, address: Address) {
        if order == self.max_order {
            self.free_lists[order as usize].push_back(address);
            return;
        }

        let buddy = Self::buddy_address(address, order);
        let list = &mut self.free_lists[order as usize];
        if let Some(pos) = list.iter().position(|&a| a == buddy) {
            list.remove(pos);
            self.merge_buddies(order + 1, address.min(buddy));
        } else {
            list.push_back(address);
        }
    }
}
