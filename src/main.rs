//! Simulator entry point: flag parsing, logging setup, shell loop.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use memsim::cli::Shell;
use memsim::config::SimulatorConfig;
use memsim::utils::parse_size;

const USAGE: &str = "\
Memory Management Simulator

Usage: memsim [options]
  --memory <bytes>                 physical memory size (default 1 MiB)
  --page-size <bytes>              page size (default 4 KiB)
  --strategy <first|best|worst>    contiguous strategy (default first)
  --page-policy <fifo|lru|clock>   page replacement policy (default lru)
  --help                           show this help";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match parse_flags(std::env::args().skip(1)) {
        Ok(Some(config)) => config,
        Ok(None) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("Error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let mut shell = Shell::new(config);
    shell.run();
    ExitCode::SUCCESS
}

/// Hand-rolled flag parsing. `Ok(None)` means `--help` was requested.
fn parse_flags(args: impl Iterator<Item = String>) -> Result<Option<SimulatorConfig>, String> {
    let mut config = SimulatorConfig::default();
    let mut args = args;

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--help" => return Ok(None),
            "--memory" => {
                let value = args.next().ok_or("--memory needs a value")?;
                config.total_memory =
                    parse_size(&value).ok_or_else(|| format!("invalid memory size '{value}'"))?;
            }
            "--page-size" => {
                let value = args.next().ok_or("--page-size needs a value")?;
                config.page_size =
                    parse_size(&value).ok_or_else(|| format!("invalid page size '{value}'"))?;
            }
            "--strategy" => {
                let value = args.next().ok_or("--strategy needs a value")?;
                config.strategy = value.parse().map_err(|e| format!("{e}"))?;
            }
            "--page-policy" => {
                let value = args.next().ok_or("--page-policy needs a value")?;
                config.page_policy = value.parse().map_err(|e| format!("{e}"))?;
            }
            other => return Err(format!("unknown flag '{other}'")),
        }
    }

    Ok(Some(config))
}
