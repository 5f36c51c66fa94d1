//! Aggregated statistics snapshot and export
//!
//! [`SystemStats`] collects every subsystem's counters into one serializable
//! value. The export formats are machine-oriented; the CLI's colored
//! rendering lives with the CLI.

use serde::Serialize;

use crate::cache::HierarchyStats;
use crate::types::MemoryStats;
use crate::vmm::VmmStats;

/// Output format for an exported snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pretty-printed JSON.
    Json,
    /// Uncolored line-per-counter text.
    PlainText,
}

/// One snapshot of the whole system's counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemStats {
    /// Allocation operations routed through the integrated system.
    pub total_operations: u64,
    /// Accesses satisfied by some cache level.
    pub cache_hits: u64,
    /// Accesses that fell through to main memory.
    pub cache_misses: u64,
    /// Contiguous-allocator counters.
    pub physical: MemoryStats,
    /// Buddy-allocator counters.
    pub buddy: MemoryStats,
    /// Paging counters.
    pub vmm: VmmStats,
    /// Cache-hierarchy counters.
    pub hierarchy: HierarchyStats,
}

impl SystemStats {
    /// Render the snapshot in `format`.
    #[must_use]
    pub fn render(&self, format: ExportFormat) -> String {
        match format {
            ExportFormat::Json => {
                serde_json::to_string_pretty(self).unwrap_or_else(|_| String::from("{}"))
            }
            ExportFormat::PlainText => self.to_text(),
        }
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        let mut line = |s: String| {
            out.push_str(&s);
            out.push('\n');
        };

        line(format!("operations: {}", self.total_operations));
        line(format!("cache_hits: {}", self.cache_hits));
        line(format!("cache_misses: {}", self.cache_misses));
        line(format!(
            "physical: used={} free={} fragmentation={:.4} requests={} successes={} failures={}",
            self.physical.used_memory,
            self.physical.free_memory,
            self.physical.fragmentation_ratio,
            self.physical.requests,
            self.physical.successes,
            self.physical.failures,
        ));
        line(format!(
            "buddy: used={} free={} internal_fragmentation={} requests={} successes={} failures={}",
            self.buddy.used_memory,
            self.buddy.free_memory,
            self.buddy.internal_fragmentation,
            self.buddy.requests,
            self.buddy.successes,
            self.buddy.failures,
        ));
        line(format!(
            "vmm: accesses={} faults={} replacements={} fault_rate={:.4} free_frames={}/{}",
            self.vmm.page_accesses,
            self.vmm.page_faults,
            self.vmm.page_replacements,
            self.vmm.page_fault_rate,
            self.vmm.free_frames,
            self.vmm.total_frames,
        ));
        line(format!(
            "cache: l1={}/{} l2={}/{} l3={}/{} main={} amat={:.2}",
            self.hierarchy.l1.hits,
            self.hierarchy.l1.accesses,
            self.hierarchy.l2.hits,
            self.hierarchy.l2.accesses,
            self.hierarchy.l3.hits,
            self.hierarchy.l3.accesses,
            self.hierarchy.main_memory_accesses,
            self.hierarchy.avg_access_time,
        ));
        out
    }
}
