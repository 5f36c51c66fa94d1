//! Integrated memory system
//!
//! Composes the contiguous allocator, the buddy allocator, the VMM, and the
//! cache hierarchy into one per-process memory service. Allocation requests
//! are routed by [`AllocationMode`]; every accepted access is translated by
//! the VMM and then pushed through the cache hierarchy.
//!
//! The per-process registry records which allocator produced each live
//! allocation, so deallocation dispatches unambiguously: the user-facing
//! handle is always the address.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::allocator::ContiguousAllocator;
use crate::buddy::BuddyAllocator;
use crate::cache::{CacheHierarchy, HierarchyStats};
use crate::config::SimulatorConfig;
use crate::error::Result;
use crate::stats::SystemStats;
use crate::types::{
    Address, AllocationMode, AllocationRequest, AllocationResult, AllocationStrategy, BlockId,
    MemoryStats, PageReplacementPolicy, ProcessId, Size,
};
use crate::vmm::{VirtualMemoryManager, VmmStats};

/// Which allocator produced an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocatorTag {
    /// The buddy allocator; the handle is the address itself.
    Buddy,
    /// The contiguous allocator; the handle is a block id.
    Contiguous,
}

/// One live allocation owned by a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessAllocation {
    /// Originating allocator.
    pub tag: AllocatorTag,
    /// Start address; the canonical user-facing handle.
    pub address: Address,
    /// Contiguous block id, or the address again for buddy blocks.
    pub block_id: BlockId,
}

/// The composed memory service.
///
/// Construction builds every subsystem; a value of this type is always
/// fully initialized. The shell keeps it in an `Option` and refuses
/// commands until `init` succeeds.
#[derive(Debug)]
pub struct IntegratedMemorySystem {
    config: SimulatorConfig,
    mode: AllocationMode,
    physical: ContiguousAllocator,
    buddy: BuddyAllocator,
    hierarchy: CacheHierarchy,
    vmm: VirtualMemoryManager,
    allocations: BTreeMap<ProcessId, Vec<ProcessAllocation>>,
    total_operations: u64,
    cache_hits: u64,
    cache_misses: u64,
}

impl IntegratedMemorySystem {
    /// Build all subsystems from `config`.
    ///
    /// The buddy domain is half the physical memory, rounded up to a power
    /// of two when the half is not one already.
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        config.validate()?;

        let physical = ContiguousAllocator::new(config.total_memory, config.strategy);

        let mut buddy_domain = config.total_memory / 2;
        if !buddy_domain.is_power_of_two() {
            buddy_domain = buddy_domain.next_power_of_two();
        }
        let buddy = BuddyAllocator::new(buddy_domain)?;

        let hierarchy = CacheHierarchy::new(&config.cache)?;
        let vmm =
            VirtualMemoryManager::new(config.total_memory, config.page_size, config.page_policy)?;

        info!(
            total_memory = config.total_memory,
            page_size = config.page_size,
            strategy = %config.strategy,
            page_policy = %config.page_policy,
            "memory system initialized"
        );

        Ok(Self {
            config,
            mode: AllocationMode::Auto,
            physical,
            buddy,
            hierarchy,
            vmm,
            allocations: BTreeMap::new(),
            total_operations: 0,
            cache_hits: 0,
            cache_misses: 0,
        })
    }

    /// Physical memory size.
    #[must_use]
    pub fn total_memory(&self) -> Size {
        self.config.total_memory
    }

    /// Page size.
    #[must_use]
    pub fn page_size(&self) -> Size {
        self.config.page_size
    }

    /// Active allocation-routing mode.
    #[must_use]
    pub fn allocation_mode(&self) -> AllocationMode {
        self.mode
    }

    /// Change the allocation-routing mode.
    pub fn set_allocation_mode(&mut self, mode: AllocationMode) {
        self.mode = mode;
        info!(%mode, "allocation mode changed");
    }

    /// Active contiguous strategy.
    #[must_use]
    pub fn allocation_strategy(&self) -> AllocationStrategy {
        self.physical.strategy()
    }

    /// Active page-replacement policy.
    #[must_use]
    pub fn page_replacement_policy(&self) -> PageReplacementPolicy {
        self.vmm.policy()
    }

    /// The contiguous allocator, for dumps and inspection.
    #[must_use]
    pub fn physical_allocator(&self) -> &ContiguousAllocator {
        &self.physical
    }

    /// The buddy allocator, for dumps and inspection.
    #[must_use]
    pub fn buddy_allocator(&self) -> &BuddyAllocator {
        &self.buddy
    }

    /// The VMM, for dumps and inspection.
    #[must_use]
    pub fn vmm(&self) -> &VirtualMemoryManager {
        &self.vmm
    }

    /// The cache hierarchy, for dumps and inspection.
    #[must_use]
    pub fn cache_hierarchy(&self) -> &CacheHierarchy {
        &self.hierarchy
    }

    /// Whether `pid` is registered.
    #[must_use]
    pub fn has_process(&self, pid: ProcessId) -> bool {
        self.allocations.contains_key(&pid)
    }

    /// Registered process ids, ascending.
    #[must_use]
    pub fn process_ids(&self) -> Vec<ProcessId> {
        self.allocations.keys().copied().collect()
    }

    /// Live allocations of `pid`, oldest first.
    #[must_use]
    pub fn process_allocations(&self, pid: ProcessId) -> Option<&[ProcessAllocation]> {
        self.allocations.get(&pid).map(Vec::as_slice)
    }

    /// Register a process with an empty allocation list and a page table.
    pub fn create_process(&mut self, pid: ProcessId) -> bool {
        if self.allocations.contains_key(&pid) {
            return false;
        }
        self.allocations.insert(pid, Vec::new());
        self.vmm.create_process(pid)
    }

    /// Free everything the process owns and unregister it.
    pub fn terminate_process(&mut self, pid: ProcessId) -> bool {
        let Some(owned) = self.allocations.get(&pid).cloned() else {
            return false;
        };
        for allocation in owned {
            if !self.release(allocation) {
                warn!(pid, address = allocation.address, "stale allocation record at termination");
            }
        }
        self.allocations.remove(&pid);
        self.vmm.terminate_process(pid)
    }

    /// Allocate `size` bytes for `pid` under the active mode.
    pub fn allocate(&mut self, pid: ProcessId, size: Size) -> AllocationResult {
        self.total_operations += 1;

        if !self.allocations.contains_key(&pid) {
            return AllocationResult::failure();
        }

        let request = AllocationRequest::new(size, pid);
        match self.mode {
            AllocationMode::Auto => {
                if size.is_power_of_two() {
                    let result = self.buddy.allocate(request);
                    if result.success {
                        self.record(pid, AllocatorTag::Buddy, result);
                        return result;
                    }
                }
                let result = self.physical.allocate(request);
                if result.success {
                    self.record(pid, AllocatorTag::Contiguous, result);
                }
                result
            }
            AllocationMode::Buddy | AllocationMode::Forced => {
                let result = self.buddy.allocate(request);
                if result.success {
                    self.record(pid, AllocatorTag::Buddy, result);
                }
                result
            }
            AllocationMode::Physical => {
                let result = self.physical.allocate(request);
                if result.success {
                    self.record(pid, AllocatorTag::Contiguous, result);
                }
                result
            }
        }
    }

    /// Free the allocation of `pid` starting at `address`.
    ///
    /// The registry decides which allocator owns the address; unknown
    /// addresses and double frees return false without state changes.
    pub fn deallocate(&mut self, pid: ProcessId, address: Address) -> bool {
        let Some(owned) = self.allocations.get(&pid) else {
            return false;
        };
        let Some(position) = owned.iter().position(|a| a.address == address) else {
            return false;
        };
        let allocation = owned[position];

        if !self.release(allocation) {
            return false;
        }
        if let Some(owned) = self.allocations.get_mut(&pid) {
            owned.remove(position);
        }
        true
    }

    /// Run one access through the VMM and the cache hierarchy.
    ///
    /// Returns true iff the VMM accepted the access; the cache outcome only
    /// moves the hit/miss counters. Translation is the identity in this
    /// simulator.
    pub fn access(&mut self, pid: ProcessId, virtual_address: Address, is_write: bool) -> bool {
        if !self.vmm.access(pid, virtual_address, is_write) {
            return false;
        }

        let physical_address = self.translate(pid, virtual_address);
        let hit = if is_write {
            self.hierarchy.write(physical_address, pid)
        } else {
            self.hierarchy.read(physical_address, pid)
        };
        if hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
        true
    }

    /// Rebuild the contiguous allocator under `strategy`, losing its state.
    ///
    /// Registry entries pointing at the old allocator dangle harmlessly:
    /// releasing them simply fails.
    pub fn switch_allocation_strategy(&mut self, strategy: AllocationStrategy) {
        self.config.strategy = strategy;
        self.physical = ContiguousAllocator::new(self.config.total_memory, strategy);
        info!(%strategy, "contiguous allocator rebuilt");
    }

    /// Rebuild the VMM under `policy` and re-register every known process.
    /// Live allocations in both allocators survive.
    pub fn switch_page_replacement_policy(&mut self, policy: PageReplacementPolicy) -> Result<()> {
        self.config.page_policy = policy;
        self.vmm = VirtualMemoryManager::new(
            self.config.total_memory,
            self.config.page_size,
            policy,
        )?;
        for &pid in self.allocations.keys() {
            self.vmm.create_process(pid);
        }
        info!(%policy, "virtual memory manager rebuilt");
        Ok(())
    }

    /// Contiguous-allocator counters.
    #[must_use]
    pub fn physical_stats(&self) -> MemoryStats {
        self.physical.stats()
    }

    /// Buddy-allocator counters.
    #[must_use]
    pub fn buddy_stats(&self) -> MemoryStats {
        self.buddy.stats()
    }

    /// Paging counters.
    #[must_use]
    pub fn vmm_stats(&self) -> VmmStats {
        self.vmm.stats()
    }

    /// Cache-hierarchy counters.
    #[must_use]
    pub fn cache_stats(&self) -> HierarchyStats {
        self.hierarchy.stats()
    }

    /// Snapshot of every subsystem's counters.
    #[must_use]
    pub fn system_stats(&self) -> SystemStats {
        SystemStats {
            total_operations: self.total_operations,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            physical: self.physical_stats(),
            buddy: self.buddy_stats(),
            vmm: self.vmm_stats(),
            hierarchy: self.cache_stats(),
        }
    }

    /// Canned allocation/access sequence used by the `test` shell command.
    /// Returns the statistics snapshot taken before the scratch process is
    /// torn down.
    pub fn run_memory_test(&mut self, name: &str) -> SystemStats {
        debug!(name, "running canned memory test");
        let pid: ProcessId = 999;
        self.create_process(pid);

        let a = self.allocate(pid, 1024);
        let b = self.allocate(pid, 2048);
        let _c = self.allocate(pid, 512);

        if a.success {
            self.access(pid, a.address, false);
        }
        if b.success {
            self.access(pid, b.address, true);
        }

        let snapshot = self.system_stats();
        self.terminate_process(pid);
        snapshot
    }

    /// Drive a fixed request mix through each contiguous strategy in turn.
    /// Rebuilds the contiguous allocator per strategy and leaves the last
    /// one active.
    pub fn benchmark_allocation_strategies(&mut self) -> Vec<(AllocationStrategy, MemoryStats)> {
        const MIX: [Size; 5] = [100, 200, 50, 300, 75];
        let pid: ProcessId = 1000;
        let mut reports = Vec::new();

        for strategy in [
            AllocationStrategy::FirstFit,
            AllocationStrategy::BestFit,
            AllocationStrategy::WorstFit,
        ] {
            self.switch_allocation_strategy(strategy);
            self.create_process(pid);
            for size in MIX {
                self.allocate(pid, size);
            }
            reports.push((strategy, self.physical_stats()));
            self.terminate_process(pid);
        }
        reports
    }

    /// Hammer one allocation with repeated reads and report the hierarchy
    /// counters. Returns `None` when the warm-up allocation fails.
    pub fn benchmark_cache_performance(&mut self) -> Option<HierarchyStats> {
        let pid: ProcessId = 1001;
        self.create_process(pid);

        let allocation = self.allocate(pid, 4096);
        if !allocation.success {
            self.terminate_process(pid);
            return None;
        }

        for _ in 0..100 {
            self.access(pid, allocation.address, false);
        }

        let snapshot = self.cache_stats();
        self.terminate_process(pid);
        Some(snapshot)
    }

    fn record(&mut self, pid: ProcessId, tag: AllocatorTag, result: AllocationResult) {
        if let Some(owned) = self.allocations.get_mut(&pid) {
            owned.push(ProcessAllocation {
                tag,
                address: result.address,
                block_id: result.block_id,
            });
        }
    }

    fn release(&mut self, allocation: ProcessAllocation) -> bool {
        match allocation.tag {
            AllocatorTag::Buddy => self.buddy.deallocate(allocation.address),
            AllocatorTag::Contiguous => self.physical.deallocate(allocation.block_id),
        }
    }

    /// Identity translation: physical address == virtual address.
    #[allow(clippy::unused_self)]
    fn translate(&self, _pid: ProcessId, virtual_address: Address) -> Address {
        virtual_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> IntegratedMemorySystem {
        IntegratedMemorySystem::new(SimulatorConfig::default()).unwrap()
    }

    #[test]
    fn auto_mode_routes_powers_of_two_to_buddy() {
        let mut sys = system();
        sys.create_process(1);

        let result = sys.allocate(1, 4096);
        assert!(result.success);
        let owned = sys.process_allocations(1).unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].tag, AllocatorTag::Buddy);
        assert_eq!(sys.buddy_stats().allocated_blocks, 1);
        assert_eq!(sys.physical_stats().allocated_blocks, 0);
    }

    #[test]
    fn auto_mode_routes_odd_sizes_to_contiguous() {
        let mut sys = system();
        sys.create_process(1);

        let result = sys.allocate(1, 1000);
        assert!(result.success);
        let owned = sys.process_allocations(1).unwrap();
        assert_eq!(owned[0].tag, AllocatorTag::Contiguous);
        assert_eq!(sys.buddy_stats().allocated_blocks, 0);
    }

    #[test]
    fn auto_mode_falls_back_when_buddy_is_full() {
        let mut sys = system();
        sys.create_process(1);

        // The buddy domain is half of physical memory; exhaust it.
        let domain = sys.buddy_allocator().total_memory();
        assert!(sys.allocate(1, domain).success);

        let result = sys.allocate(1, 4096);
        assert!(result.success, "fallback to contiguous must succeed");
        let owned = sys.process_allocations(1).unwrap();
        assert_eq!(owned[1].tag, AllocatorTag::Contiguous);
    }

    #[test]
    fn physical_mode_never_touches_buddy() {
        let mut sys = system();
        sys.create_process(1);
        sys.set_allocation_mode(AllocationMode::Physical);

        assert!(sys.allocate(1, 4096).success);
        assert_eq!(sys.buddy_stats().requests, 0);
        assert_eq!(sys.physical_stats().allocated_blocks, 1);
    }

    #[test]
    fn forced_mode_routes_everything_to_buddy() {
        let mut sys = system();
        sys.create_process(1);
        sys.set_allocation_mode(AllocationMode::Forced);

        // 1000 rounds to 1024 inside the buddy allocator and succeeds.
        assert!(sys.allocate(1, 1000).success);
        // Oversized requests fail outright; nothing reaches the contiguous
        // allocator.
        let domain = sys.buddy_allocator().total_memory();
        assert!(!sys.allocate(1, domain + 1).success);
        assert_eq!(sys.physical_stats().requests, 0);
    }

    #[test]
    fn allocation_for_unknown_process_fails() {
        let mut sys = system();
        assert!(!sys.allocate(42, 4096).success);
        assert_eq!(sys.system_stats().total_operations, 1);
    }

    #[test]
    fn deallocate_dispatches_by_tag() {
        let mut sys = system();
        sys.create_process(1);

        let buddy = sys.allocate(1, 4096);
        let contiguous = sys.allocate(1, 1000);

        assert!(sys.deallocate(1, buddy.address));
        assert!(sys.deallocate(1, contiguous.address));
        assert!(sys.process_allocations(1).unwrap().is_empty());
        assert_eq!(sys.buddy_stats().allocated_blocks, 0);
        assert_eq!(sys.physical_stats().allocated_blocks, 0);
    }

    #[test]
    fn deallocate_rejects_unknown_address_and_double_free() {
        let mut sys = system();
        sys.create_process(1);
        let result = sys.allocate(1, 4096);

        assert!(!sys.deallocate(1, 0xdead_beef));
        assert!(sys.deallocate(1, result.address));
        assert!(!sys.deallocate(1, result.address));
    }

    #[test]
    fn terminate_releases_everything() {
        let mut sys = system();
        sys.create_process(1);
        sys.allocate(1, 4096);
        sys.allocate(1, 1000);
        sys.access(1, 0, false);

        assert!(sys.terminate_process(1));
        assert!(!sys.has_process(1));
        assert_eq!(sys.buddy_stats().allocated_blocks, 0);
        assert_eq!(sys.physical_stats().allocated_blocks, 0);
        assert_eq!(sys.vmm_stats().free_frames, sys.vmm_stats().total_frames);
    }

    #[test]
    fn access_pipeline_updates_cache_counters() {
        let mut sys = system();
        sys.create_process(1);

        assert!(sys.access(1, 0, false)); // cold: miss
        assert!(sys.access(1, 0, false)); // warm: hit
        let stats = sys.system_stats();
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.vmm.page_faults, 1);
    }

    #[test]
    fn access_rejected_for_unknown_process() {
        let mut sys = system();
        assert!(!sys.access(9, 0, false));
        assert_eq!(sys.system_stats().cache_hits + sys.system_stats().cache_misses, 0);
    }

    #[test]
    fn strategy_switch_resets_contiguous_state() {
        let mut sys = system();
        sys.create_process(1);
        let old = sys.allocate(1, 1000);
        assert!(old.success);

        sys.switch_allocation_strategy(AllocationStrategy::BestFit);
        assert_eq!(sys.allocation_strategy(), AllocationStrategy::BestFit);
        assert_eq!(sys.physical_stats().allocated_blocks, 0);

        // The stale record now dangles; freeing it reports failure.
        assert!(!sys.deallocate(1, old.address));
    }

    #[test]
    fn policy_switch_preserves_processes_and_allocations() {
        let mut sys = system();
        sys.create_process(1);
        let kept = sys.allocate(1, 4096);

        sys.switch_page_replacement_policy(PageReplacementPolicy::Clock).unwrap();
        assert_eq!(sys.page_replacement_policy(), PageReplacementPolicy::Clock);
        assert!(sys.has_process(1));
        assert_eq!(sys.buddy_stats().allocated_blocks, 1);
        assert!(sys.deallocate(1, kept.address));
    }

    #[test]
    fn duplicate_create_fails() {
        let mut sys = system();
        assert!(sys.create_process(1));
        assert!(!sys.create_process(1));
        assert!(!sys.terminate_process(2));
    }

    #[test]
    fn canned_test_cleans_up_after_itself() {
        let mut sys = system();
        let snapshot = sys.run_memory_test("default");
        assert!(snapshot.total_operations >= 3);
        assert!(!sys.has_process(999));
    }

    #[test]
    fn strategy_benchmark_reports_all_three() {
        let mut sys = system();
        let reports = sys.benchmark_allocation_strategies();
        assert_eq!(reports.len(), 3);
        for (_, stats) in &reports {
            assert_eq!(stats.requests, 5);
        }
        assert!(!sys.has_process(1000));
    }

    #[test]
    fn cache_benchmark_warms_the_line() {
        let mut sys = system();
        let stats = sys.benchmark_cache_performance().unwrap();
        assert!(stats.l1_hits >= 99, "after the first fill every read must hit L1");
        assert!(!sys.has_process(1001));
    }
}
