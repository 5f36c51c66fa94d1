//! Interactive shell
//!
//! Line-oriented command loop over the integrated system. The system is
//! built by the `init` command; until it succeeds every other stateful
//! command is refused with an inline message, and a second `init` is
//! rejected. Parse errors never terminate the loop.

mod render;

use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::config::SimulatorConfig;
use crate::stats::ExportFormat;
use crate::system::IntegratedMemorySystem;
use crate::types::{Address, AllocationMode, ProcessId, NO_PROCESS};
use crate::utils::{format_size, parse_address, parse_size};

/// The interactive command shell.
pub struct Shell {
    config: SimulatorConfig,
    system: Option<IntegratedMemorySystem>,
    current_process: ProcessId,
    running: bool,
}

impl Shell {
    /// Shell over an uninitialized system configured by `config`.
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            system: None,
            current_process: NO_PROCESS,
            running: false,
        }
    }

    /// The system, if `init` has succeeded.
    #[must_use]
    pub fn system(&self) -> Option<&IntegratedMemorySystem> {
        self.system.as_ref()
    }

    /// Read commands from stdin until `quit` or end of input.
    pub fn run(&mut self) {
        self.running = true;
        println!("=== Memory Management Simulator ===");
        println!("Type 'help' for available commands or 'quit' to exit.");

        let stdin = io::stdin();
        while self.running {
            self.print_prompt();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        self.execute(trimmed);
                    }
                }
            }
        }
    }

    /// Execute one command line. Returns whether the command succeeded.
    pub fn execute(&mut self, line: &str) -> bool {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = tokens.split_first() else {
            return false;
        };

        match command {
            "init" => self.handle_init(),
            "create" => self.handle_create(args),
            "setproc" => self.handle_setproc(args),
            "terminate" => self.handle_terminate(args),
            "alloc" => self.handle_alloc(args),
            "free" => self.handle_free(args),
            "access" => self.handle_access(args),
            "mode" => self.handle_mode(args),
            "strategy" => self.handle_strategy(args),
            "policy" => self.handle_policy(args),
            "dump" => self.handle_dump(args),
            "stats" => self.handle_stats(args),
            "process" => self.handle_process(args),
            "bench" => self.handle_bench(args),
            "test" => self.handle_test(args),
            "color" => self.handle_color(args),
            "help" => {
                render::print_help();
                true
            }
            "quit" => {
                self.running = false;
                true
            }
            other => {
                println!("Unknown command: {other}");
                false
            }
        }
    }

    fn print_prompt(&self) {
        let process = if self.current_process >= 0 {
            format!("P{}", self.current_process)
        } else {
            String::from("NO-PROC")
        };
        let (mode, policy) = match &self.system {
            Some(system) => (
                system.allocation_mode().to_string(),
                system.page_replacement_policy().to_string(),
            ),
            None => (String::from("-"), String::from("-")),
        };

        print!("{}", format!("memsim[{process} | {mode} | {policy}]> ").cyan());
        let _ = io::stdout().flush();
    }

    /// The system, or an inline complaint.
    fn require_system(&mut self) -> Option<&mut IntegratedMemorySystem> {
        if self.system.is_none() {
            println!("Error: system not initialized. Run 'init' first.");
        }
        self.system.as_mut()
    }

    fn handle_init(&mut self) -> bool {
        if self.system.is_some() {
            println!("Error: system already initialized.");
            return false;
        }
        match IntegratedMemorySystem::new(self.config.clone()) {
            Ok(system) => {
                println!("Memory system initialized successfully");
                println!("Total memory: {}", format_size(system.total_memory()));
                println!("Page size: {}", format_size(system.page_size()));
                self.system = Some(system);
                true
            }
            Err(err) => {
                println!("{}", format!("Failed to initialize memory system: {err}").red());
                false
            }
        }
    }

    fn handle_create(&mut self, args: &[&str]) -> bool {
        let Some(system) = self.require_system() else { return false };
        let [token] = args else {
            println!("Usage: create <pid>");
            return false;
        };
        let Some(pid) = parse_pid(token).filter(|&pid| pid >= 0) else {
            println!("Invalid process id: {token}");
            return false;
        };
        if system.create_process(pid) {
            println!("Process P{pid} created");
            true
        } else {
            println!("Error: process P{pid} already exists.");
            false
        }
    }

    fn handle_setproc(&mut self, args: &[&str]) -> bool {
        if self.require_system().is_none() {
            return false;
        }
        let [token] = args else {
            println!("Usage: setproc <pid>");
            return false;
        };
        let Some(pid) = parse_pid(token) else {
            println!("Invalid process id: {token}");
            return false;
        };
        let exists = self.system.as_ref().is_some_and(|s| s.has_process(pid));
        if !exists {
            println!("Error: process does not exist.");
            return false;
        }
        self.current_process = pid;
        true
    }

    fn handle_terminate(&mut self, args: &[&str]) -> bool {
        let [token] = args else {
            println!("Usage: terminate <pid>");
            return false;
        };
        let Some(pid) = parse_pid(token) else {
            println!("Invalid process id: {token}");
            return false;
        };
        let Some(system) = self.require_system() else { return false };
        if system.terminate_process(pid) {
            if self.current_process == pid {
                self.current_process = NO_PROCESS;
            }
            println!("Process P{pid} terminated");
            true
        } else {
            println!("Error: process does not exist.");
            false
        }
    }

    fn handle_alloc(&mut self, args: &[&str]) -> bool {
        let current = self.current_process;
        let Some(system) = self.require_system() else { return false };

        let (pid, size) = match args {
            [size_token] => {
                if current < 0 {
                    println!("Error: no process selected. Use 'create' and 'setproc'.");
                    return false;
                }
                (current, parse_size(size_token))
            }
            [pid_token, size_token] => match parse_pid(pid_token) {
                Some(pid) => (pid, parse_size(size_token)),
                None => {
                    println!("Invalid process id: {pid_token}");
                    return false;
                }
            },
            _ => {
                println!("Usage: alloc [pid] <size>");
                return false;
            }
        };

        let Some(size) = size.filter(|&s| s > 0) else {
            println!("Invalid size");
            return false;
        };

        let result = system.allocate(pid, size);
        if result.success {
            println!(
                "Allocated {} at {}",
                format_size(size),
                crate::utils::format_address(result.address)
            );
            true
        } else {
            println!("Allocation failed. Did you create the process?");
            false
        }
    }

    fn handle_free(&mut self, args: &[&str]) -> bool {
        let Some(system) = self.require_system() else { return false };
        let [pid_token, addr_token] = args else {
            println!("Usage: free <pid> <addr>");
            return false;
        };
        let (Some(pid), Some(address)) = (parse_pid(pid_token), parse_address(addr_token)) else {
            println!("Invalid pid or address");
            return false;
        };
        if system.deallocate(pid, address) {
            true
        } else {
            println!("Free failed: invalid address or permission denied");
            false
        }
    }

    fn handle_access(&mut self, args: &[&str]) -> bool {
        let current = self.current_process;
        let Some(system) = self.require_system() else { return false };

        let (pid, address, is_write): (ProcessId, Option<Address>, bool) = match args {
            [addr_token] => {
                if current < 0 {
                    println!("Error: no process selected. Use 'create' and 'setproc'.");
                    return false;
                }
                (current, parse_address(addr_token), false)
            }
            [pid_token, addr_token] => match parse_pid(pid_token) {
                Some(pid) => (pid, parse_address(addr_token), false),
                None => {
                    println!("Invalid process id: {pid_token}");
                    return false;
                }
            },
            [pid_token, addr_token, "write"] => match parse_pid(pid_token) {
                Some(pid) => (pid, parse_address(addr_token), true),
                None => {
                    println!("Invalid process id: {pid_token}");
                    return false;
                }
            },
            _ => {
                println!("Usage: access [pid] <addr> [write]");
                return false;
            }
        };

        let Some(address) = address else {
            println!("Invalid address");
            return false;
        };

        if system.access(pid, address, is_write) {
            true
        } else {
            println!("Access failed: unknown process or unserviceable fault");
            false
        }
    }

    fn handle_mode(&mut self, args: &[&str]) -> bool {
        let Some(system) = self.require_system() else { return false };
        let [token] = args else {
            println!("Usage: mode auto | buddy | physical | forced");
            return false;
        };
        match token.parse::<AllocationMode>() {
            Ok(mode) => {
                system.set_allocation_mode(mode);
                println!("Allocation mode set to {mode}");
                true
            }
            Err(err) => {
                println!("{err}");
                false
            }
        }
    }

    fn handle_strategy(&mut self, args: &[&str]) -> bool {
        let Some(system) = self.require_system() else { return false };
        let [token] = args else {
            println!("Usage: strategy first | best | worst");
            return false;
        };
        match token.parse() {
            Ok(strategy) => {
                system.switch_allocation_strategy(strategy);
                println!("Allocation strategy set to {strategy}");
                true
            }
            Err(err) => {
                println!("{err}");
                false
            }
        }
    }

    fn handle_policy(&mut self, args: &[&str]) -> bool {
        let Some(system) = self.require_system() else { return false };
        let [token] = args else {
            println!("Usage: policy fifo | lru | clock");
            return false;
        };
        match token.parse() {
            Ok(policy) => match system.switch_page_replacement_policy(policy) {
                Ok(()) => {
                    println!("Page replacement policy set to {policy}");
                    true
                }
                Err(err) => {
                    println!("{}", format!("Policy switch failed: {err}").red());
                    false
                }
            },
            Err(err) => {
                println!("{err}");
                false
            }
        }
    }

    fn handle_dump(&mut self, args: &[&str]) -> bool {
        let Some(system) = self.require_system() else { return false };
        if args.first() == Some(&"bar") {
            render::print_memory_bar(system);
        } else {
            render::print_dump(system);
        }
        true
    }

    fn handle_stats(&mut self, args: &[&str]) -> bool {
        let Some(system) = self.require_system() else { return false };
        if args.first() == Some(&"json") {
            println!("{}", system.system_stats().render(ExportFormat::Json));
        } else {
            render::print_stats(system);
        }
        true
    }

    fn handle_process(&mut self, args: &[&str]) -> bool {
        let current = self.current_process;
        let Some(system) = self.require_system() else { return false };
        let pid = match args.first() {
            Some(token) => match parse_pid(token) {
                Some(pid) => pid,
                None => {
                    println!("Invalid process id: {token}");
                    return false;
                }
            },
            None => current,
        };
        if pid < 0 || !system.has_process(pid) {
            println!("Error: process does not exist.");
            return false;
        }
        render::print_process_info(system, pid);
        true
    }

    fn handle_bench(&mut self, args: &[&str]) -> bool {
        let Some(system) = self.require_system() else { return false };
        match args.first().copied().unwrap_or("alloc") {
            "alloc" => {
                println!("{}", "[Benchmark: allocation strategies]".cyan());
                for (strategy, stats) in system.benchmark_allocation_strategies() {
                    println!(
                        "  {strategy:<10} requests={} successes={} fragmentation={:.2} %",
                        stats.requests,
                        stats.successes,
                        stats.fragmentation_ratio * 100.0,
                    );
                }
                true
            }
            "cache" => {
                println!("{}", "[Benchmark: cache hierarchy]".cyan());
                match system.benchmark_cache_performance() {
                    Some(stats) => {
                        println!(
                            "  accesses={} l1_hits={} main={} amat={:.2} cycles",
                            stats.total_accesses,
                            stats.l1_hits,
                            stats.main_memory_accesses,
                            stats.avg_access_time,
                        );
                        true
                    }
                    None => {
                        println!("  warm-up allocation failed");
                        false
                    }
                }
            }
            other => {
                println!("Unknown benchmark: {other}. Use alloc | cache");
                false
            }
        }
    }

    fn handle_test(&mut self, args: &[&str]) -> bool {
        let Some(system) = self.require_system() else { return false };
        let name = args.first().copied().unwrap_or("default");
        let snapshot = system.run_memory_test(name);
        println!("{}", format!("[Test '{name}' complete]").cyan());
        println!("{}", snapshot.render(ExportFormat::PlainText));
        true
    }

    fn handle_color(&mut self, args: &[&str]) -> bool {
        match args {
            ["on"] => {
                colored::control::set_override(true);
                println!("Color output enabled");
                true
            }
            ["off"] => {
                colored::control::set_override(false);
                println!("Color output disabled");
                true
            }
            _ => {
                println!("Usage: color on | off");
                false
            }
        }
    }
}

fn parse_pid(token: &str) -> Option<ProcessId> {
    token.parse().ok()
}
