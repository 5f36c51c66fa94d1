//! Contiguous physical allocator
//!
//! Manages an ordered sequence of free and allocated extents covering one
//! linear region. The block list always partitions `[0, total_memory)` by
//! increasing start address with no gaps and no overlaps: allocation splits
//! the chosen free block in place, and every deallocation runs a coalescing
//! pass that merges adjacent free neighbors.
//!
//! The first-fit, best-fit, and worst-fit selection policies share all
//! bookkeeping and differ only in [`ContiguousAllocator::find_free_block`].

use tracing::{debug, trace};

use crate::types::{
    AllocationRequest, AllocationResult, AllocationStrategy, BlockId, BlockStatus, MemoryBlock,
    MemoryStats, Size, NO_PROCESS,
};

/// Contiguous allocator over a single linear region.
#[derive(Debug, Clone)]
pub struct ContiguousAllocator {
    blocks: Vec<MemoryBlock>,
    total_memory: Size,
    strategy: AllocationStrategy,
    next_block_id: BlockId,
    requests: u64,
    successes: u64,
    failures: u64,
    internal_fragmentation: u64,
}

impl ContiguousAllocator {
    /// Build an allocator over `total_memory` bytes using `strategy`.
    pub fn new(total_memory: Size, strategy: AllocationStrategy) -> Self {
        let mut allocator = Self {
            blocks: Vec::new(),
            total_memory,
            strategy,
            next_block_id: 0,
            requests: 0,
            successes: 0,
            failures: 0,
            internal_fragmentation: 0,
        };
        allocator.initialize(total_memory);
        allocator
    }

    /// Reset to a single free block spanning `[0, total_memory)` and clear
    /// all counters.
    pub fn initialize(&mut self, total_memory: Size) {
        self.total_memory = total_memory;
        self.blocks.clear();
        self.next_block_id = 0;
        self.requests = 0;
        self.successes = 0;
        self.failures = 0;
        self.internal_fragmentation = 0;

        let id = self.fresh_block_id();
        self.blocks.push(MemoryBlock::free(0, total_memory, id));
    }

    /// Selection strategy in effect.
    #[must_use]
    pub fn strategy(&self) -> AllocationStrategy {
        self.strategy
    }

    /// Bytes under management.
    #[must_use]
    pub fn total_memory(&self) -> Size {
        self.total_memory
    }

    /// Current block partition, ordered by start address.
    #[must_use]
    pub fn blocks(&self) -> &[MemoryBlock] {
        &self.blocks
    }

    /// Satisfy `request` according to the active strategy.
    ///
    /// Zero-sized requests are counted and rejected. When the chosen free
    /// block is strictly larger than the request it is split: the front
    /// keeps its identity and becomes the allocation, the remainder becomes
    /// a fresh free block.
    pub fn allocate(&mut self, request: AllocationRequest) -> AllocationResult {
        self.requests += 1;
        if request.size == 0 {
            self.failures += 1;
            return AllocationResult::failure();
        }

        let Some(index) = self.find_free_block(request.size) else {
            self.failures += 1;
            debug!(size = request.size, pid = request.pid, "contiguous allocation failed: no fit");
            return AllocationResult::failure();
        };

        if self.blocks[index].size > request.size {
            self.internal_fragmentation += u64::from(self.blocks[index].size - request.size);
            self.split_block(index, request.size);
        }

        let block = &mut self.blocks[index];
        block.status = BlockStatus::Allocated;
        block.owner = request.pid;
        block.requested_size = request.size;
        self.successes += 1;

        trace!(
            address = block.start,
            block_id = block.block_id,
            size = request.size,
            pid = request.pid,
            "contiguous allocation"
        );
        AllocationResult::success(block.start, block.block_id)
    }

    /// Release the block with identifier `block_id`.
    ///
    /// Returns false when the identifier is unknown or the block is not
    /// allocated (double free); no state changes in that case.
    pub fn deallocate(&mut self, block_id: BlockId) -> bool {
        let Some(index) = self.blocks.iter().position(|b| b.block_id == block_id) else {
            return false;
        };
        if self.blocks[index].status != BlockStatus::Allocated {
            return false;
        }

        let block = &mut self.blocks[index];
        block.status = BlockStatus::Free;
        block.owner = NO_PROCESS;
        block.requested_size = 0;
        trace!(block_id, "contiguous deallocation");

        self.coalesce();
        true
    }

    /// Merge address-contiguous free neighbors. Idempotent.
    pub fn coalesce(&mut self) {
        if self.blocks.len() < 2 {
            return;
        }
        self.blocks.sort_by_key(|b| b.start);

        let mut i = 0;
        while i + 1 < self.blocks.len() {
            let mergeable = self.blocks[i].is_free()
                && self.blocks[i + 1].is_free()
                && self.blocks[i].end() == self.blocks[i + 1].start;
            if mergeable {
                self.blocks[i].size += self.blocks[i + 1].size;
                self.blocks.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }

    /// Snapshot of counters and the current partition.
    #[must_use]
    pub fn stats(&self) -> MemoryStats {
        let mut used = 0;
        let mut free = 0;
        let mut largest_free = 0;
        let mut free_blocks = 0;

        for block in &self.blocks {
            match block.status {
                BlockStatus::Allocated => used += block.size,
                BlockStatus::Free => {
                    free += block.size;
                    free_blocks += 1;
                    largest_free = largest_free.max(block.size);
                }
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
            total_blocks: self.blocks.len(),
            free_blocks,
            allocated_blocks: self.blocks.len() - free_blocks,
            largest_free_block: largest_free,
            internal_fragmentation: self.internal_fragmentation,
            requests: self.requests,
            successes: self.successes,
            failures: self.failures,
            utilization,
        }
    }

    fn fresh_block_id(&mut self) -> BlockId {
        let id = self.next_block_id;
        self.next_block_id += 1;
        id
    }

    /// Pick a free block of at least `size` bytes under the active strategy.
    /// Ties always go to the first candidate in address order.
    fn find_free_block(&self, size: Size) -> Option<usize> {
        let candidates = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_free() && b.size >= size);

        match self.strategy {
            AllocationStrategy::FirstFit => candidates.map(|(i, _)| i).next(),
            AllocationStrategy::BestFit => {
                let mut best: Option<(usize, Size)> = None;
                for (i, block) in candidates {
                    if best.map_or(true, |(_, sz)| block.size < sz) {
                        best = Some((i, block.size));
                    }
                }
                best.map(|(i, _)| i)
            }
            AllocationStrategy::WorstFit => {
                let mut worst: Option<(usize, Size)> = None;
                for (i, block) in candidates {
                    if worst.map_or(true, |(_, sz)| block.size > sz) {
                        worst = Some((i, block.size));
                    }
                }
                worst.map(|(i, _)| i)
            }
        }
    }

    /// Split the free block at `index`, keeping the front `requested` bytes
    /// under the original identity and inserting the remainder as a fresh
    /// free block right after it.
    fn split_block(&mut self, index: usize, requested: Size) {
        debug_assert!(self.blocks[index].is_free());
        debug_assert!(self.blocks[index].size > requested);

        let remainder_start = self.blocks[index].start + requested;
        let remainder_size = self.blocks[index].size - requested;
        let remainder_id = self.fresh_block_id();

        self.blocks[index].size = requested;
        self.blocks
            .insert(index + 1, MemoryBlock::free(remainder_start, remainder_size, remainder_id));
    }
}
