//! Colored rendering for dumps, statistics, and help
//!
//! All human-facing formatting lives here so the shell stays a thin
//! dispatcher. Coloring goes through the `colored` crate; the `color`
//! command flips its global override.

use colored::Colorize;

use crate::system::{AllocatorTag, IntegratedMemorySystem};
use crate::types::{BlockStatus, MemoryStats, ProcessId};
use crate::utils::{format_address, format_size};

const BAR_WIDTH: usize = 64;

/// Full memory dump: the contiguous partition plus buddy occupancy.
pub fn print_dump(system: &IntegratedMemorySystem) {
    println!("{}", "=== MEMORY DUMP ===".cyan());

    println!("{}", "[Contiguous region]".blue());
    for block in system.physical_allocator().blocks() {
        let status = match block.status {
            BlockStatus::Free => "FREE".green(),
            BlockStatus::Allocated => "ALLOCATED".red(),
        };
        let owner = if block.is_free() {
            String::from("-")
        } else {
            format!("P{}", block.owner)
        };
        println!(
            "  {} {:>12} {:<10} id={:<4} {}",
            format_address(block.start),
            format_size(block.size),
            status,
            block.block_id,
            owner,
        );
    }

    println!("{}", "[Buddy region]".blue());
    let allocated = system.buddy_allocator().allocated_blocks();
    if allocated.is_empty() {
        println!("  no allocated blocks");
    }
    for block in &allocated {
        println!(
            "  {} {:>12} {} P{}",
            format_address(block.start),
            format_size(block.size),
            "ALLOCATED".red(),
            block.owner,
        );
    }
    for block in system.buddy_allocator().free_blocks() {
        println!(
            "  {} {:>12} {}",
            format_address(block.start),
            format_size(block.size),
            "FREE".green(),
        );
    }
}

/// One-line proportional bar over the contiguous region.
pub fn print_memory_bar(system: &IntegratedMemorySystem) {
    let allocator = system.physical_allocator();
    let total = allocator.total_memory();
    if total == 0 {
        return;
    }

    let mut colored_bar = String::with_capacity(BAR_WIDTH);
    for block in allocator.blocks() {
        let cells = ((u64::from(block.size) * BAR_WIDTH as u64) / u64::from(total)) as usize;
        let cells = cells.max(1);
        let (ch, colorize): (char, fn(&str) -> colored::ColoredString) = match block.status {
            BlockStatus::Free => ('.', |s| s.green()),
            BlockStatus::Allocated => ('#', |s| s.red()),
        };
        let run: String = std::iter::repeat(ch).take(cells).collect();
        colored_bar.push_str(&colorize(&run).to_string());
    }

    println!("[{}]", colored_bar);
    println!(
        "{} total, {} used, {} free",
        format_size(total),
        format_size(allocator.stats().used_memory),
        format_size(allocator.stats().free_memory),
    );
}

/// Full statistics report across all subsystems.
pub fn print_stats(system: &IntegratedMemorySystem) {
    let stats = system.system_stats();

    println!("{}", "\n================ SYSTEM STATISTICS ================".cyan());
    println!("Total Operations        : {}", stats.total_operations);

    println!("{}", "\n[Physical Allocator]".blue());
    print_allocator_stats(&stats.physical, true);

    println!("{}", "\n[Buddy Allocator]".blue());
    print_allocator_stats(&stats.buddy, false);
    println!(
        "  Internal Fragmentation: {}",
        format_size(stats.buddy.internal_fragmentation.min(u64::from(u32::MAX)) as u32).yellow(),
    );

    println!("{}", "\n[Virtual Memory]".blue());
    println!("  Page Accesses         : {}", stats.vmm.page_accesses);
    println!("  Page Faults           : {}", stats.vmm.page_faults.to_string().red());
    println!("  Page Replacements     : {}", stats.vmm.page_replacements);
    let fault_pct = stats.vmm.page_fault_rate * 100.0;
    println!("  Page Fault Rate       : {}", percent(fault_pct, 10.0, 30.0, true));
    println!(
        "  Free Frames           : {} / {}",
        stats.vmm.free_frames, stats.vmm.total_frames
    );

    println!("{}", "\n[Cache Hierarchy]".blue());
    for (name, level) in [
        ("L1 Cache", &stats.hierarchy.l1),
        ("L2 Cache", &stats.hierarchy.l2),
        ("L3 Cache", &stats.hierarchy.l3),
    ] {
        println!("  {name}");
        println!("    Hits / Misses       : {} / {}", level.hits, level.misses);
        println!("    Hit Ratio           : {}", percent(level.hit_rate * 100.0, 30.0, 70.0, false));
    }
    println!("  Main Memory Accesses  : {}", stats.hierarchy.main_memory_accesses);
    println!("  AMAT                  : {:.2} cycles", stats.hierarchy.avg_access_time);

    println!("{}", "\n==================================================".cyan());
}

fn print_allocator_stats(stats: &MemoryStats, external_fragmentation: bool) {
    println!("  Used Memory           : {}", format_size(stats.used_memory));
    println!("  Free Memory           : {}", format_size(stats.free_memory));
    if external_fragmentation {
        let frag_pct = stats.fragmentation_ratio * 100.0;
        println!("  External Fragmentation: {}", percent(frag_pct, 10.0, 30.0, true));
    }
    println!("  Requests              : {}", stats.requests);
    println!("  Success / Failure     : {} / {}", stats.successes, stats.failures);
    println!("  Utilization           : {:.2} %", stats.utilization * 100.0);
}

/// Colorize a percentage: for costs (`high_is_bad`) green below the first
/// threshold, for ratios green above the second.
fn percent(value: f64, low: f64, high: f64, high_is_bad: bool) -> colored::ColoredString {
    let text = format!("{value:.2} %");
    if high_is_bad {
        if value > high {
            text.red()
        } else if value > low {
            text.yellow()
        } else {
            text.green()
        }
    } else if value >= high {
        text.green()
    } else if value >= low {
        text.yellow()
    } else {
        text.red()
    }
}

/// Allocation list for one process.
pub fn print_process_info(system: &IntegratedMemorySystem, pid: ProcessId) {
    let Some(allocations) = system.process_allocations(pid) else {
        println!("Error: process does not exist.");
        return;
    };

    println!("Process {} allocations: {}", format!("P{pid}").cyan(), allocations.len());
    for allocation in allocations {
        let tag = match allocation.tag {
            AllocatorTag::Buddy => "buddy",
            AllocatorTag::Contiguous => "contiguous",
        };
        println!("  {} ({tag})", format_address(allocation.address));
    }

    if let Some(table) = system.vmm().page_table(pid) {
        println!(
            "Resident pages: {} ({} modified)",
            table.present_pages(),
            table.modified_pages()
        );
    }
}

/// Command reference, grouped like the prompt's workflow.
pub fn print_help() {
    let section = |title: &str, commands: &[(&str, &str)]| {
        println!("{}", format!("\n{title}").cyan());
        for (name, description) in commands {
            println!("  {name:<36}{description}");
        }
    };

    println!("{}", "\n================ AVAILABLE COMMANDS ================".cyan());
    section(
        "System",
        &[
            ("init", "Initialize memory system"),
            ("quit", "Exit simulator"),
            ("help", "Show this help"),
        ],
    );
    section(
        "Process",
        &[
            ("create <pid>", "Create a new process"),
            ("setproc <pid>", "Set current process"),
            ("terminate <pid>", "Terminate a process"),
            ("process [pid]", "Show process information"),
        ],
    );
    section(
        "Memory Allocation",
        &[
            ("alloc [pid] <size>", "Allocate memory (b / kb / mb suffixes)"),
            ("free <pid> <addr>", "Free allocated memory"),
            ("mode <auto|buddy|physical|forced>", "Set allocation mode"),
            ("strategy <first|best|worst>", "Set contiguous strategy"),
        ],
    );
    section(
        "Virtual Memory",
        &[
            ("access [pid] <addr> [write]", "Access virtual address"),
            ("policy <fifo|lru|clock>", "Set page replacement policy"),
        ],
    );
    section(
        "Inspection",
        &[
            ("dump [bar]", "Dump physical memory layout"),
            ("stats", "Show system statistics"),
            ("bench [alloc|cache]", "Run benchmarks"),
            ("test [name]", "Run canned memory test"),
        ],
    );
    section("UI / UX", &[("color <on|off>", "Toggle colored output")]);
    println!("{}", "\n====================================================".cyan());
}
