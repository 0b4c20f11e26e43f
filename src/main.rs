//! Preflight Bench - hardware benchmark and requirement check
//!
//! Runs short synthetic CPU, RAM and disk workloads, scores them on a 0-10 scale and reports
//! whether the machine meets the minimum requirements.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use preflight_bench::config::{self, Config};
use preflight_bench::engine::{Engine, RunOptions};
use preflight_bench::hardware::{FactsSource, FileFacts, HardwareFacts, SystemFacts};
use preflight_bench::record::BenchmarkRecord;
use preflight_bench::report;
use preflight_bench::requirements::validate_requirements;

/// Exit code when the machine misses a requirement.
const EXIT_VIOLATIONS: i32 = 2;

/// Preflight Bench - Benchmark and score this machine
#[derive(Parser)]
#[command(name = "preflight-bench")]
#[command(author = "ForgeMyPC")]
#[command(version)]
#[command(about = "Benchmark CPU, RAM and disks and check minimum requirements")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every benchmark stage and print the report
    Run {
        /// Read hardware facts from a JSON file instead of detecting them
        #[arg(long)]
        facts: Option<PathBuf>,

        /// Write the record as JSON to this path (text report goes beside it as .txt)
        #[arg(long)]
        json: Option<PathBuf>,

        /// Skip the memory stage
        #[arg(long)]
        skip_memory: bool,

        /// Skip the disk stage
        #[arg(long)]
        skip_disk: bool,

        /// Hide the stage progress lines
        #[arg(short, long)]
        quiet: bool,
    },

    /// Detect and print hardware facts
    Detect {
        /// Print JSON instead of the text box
        #[arg(long)]
        json: bool,
    },

    /// Check minimum requirements without benchmarking
    Check {
        /// Read hardware facts from a JSON file instead of detecting them
        #[arg(long)]
        facts: Option<PathBuf>,
    },

    /// Recompute scores and violations of a saved record
    Score {
        /// Record written by `run --json`
        #[arg(long)]
        record: PathBuf,
    },

    /// Show configuration
    Config {
        /// Write the default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            facts,
            json,
            skip_memory,
            skip_disk,
            quiet,
        } => {
            let config = Config::load()?;
            let facts = collect_facts(facts.as_deref())?;
            let options = RunOptions {
                quiet,
                progress: None,
                skip_memory,
                skip_disk,
            };

            if !quiet {
                println!("{}", "Running benchmarks...".bright_cyan().bold());
            }
            let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
            let engine = Engine::new(config);
            let record = rt.block_on(engine.run(&facts, &options));

            println!("\n{}", report::render_text(&record));
            if let Some(error) = record.timings.cpu.error() {
                println!(
                    "{} {}",
                    "CPU stage failed, its score is 0:".bright_yellow(),
                    error.bright_white()
                );
            }

            let path = match json {
                Some(path) => path,
                None => report::default_report_path()?,
            };
            let text_path = report::write_reports(&record, &path)?;
            println!(
                "\n{} {}",
                "Report saved:".bright_green(),
                path.display().to_string().bright_white()
            );
            println!(
                "{} {}",
                "Text report:".bright_green(),
                text_path.display().to_string().bright_white()
            );

            exit_on_violations(&record);
        }
        Commands::Detect { json } => {
            let facts = SystemFacts.collect()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&facts)?);
            } else {
                println!("{}", report::render_facts(&facts));
            }
        }
        Commands::Check { facts } => {
            let config = Config::load()?;
            let facts = collect_facts(facts.as_deref())?;
            let violations = validate_requirements(&facts, &config.requirements);

            if violations.is_empty() {
                println!("{}", "✓ All minimum requirements met.".bright_green().bold());
            } else {
                println!("{}", "✗ Minimum requirements not met:".bright_red().bold());
                for violation in &violations {
                    println!("   {} {}", "-".bright_red(), violation.bright_white());
                }
                std::process::exit(EXIT_VIOLATIONS);
            }
        }
        Commands::Score { record } => {
            let config = Config::load()?;
            let saved = report::read_json(&record)?;
            let rescored = Engine::new(config).reassess(saved);
            println!("{}", report::render_text(&rescored));
            exit_on_violations(&rescored);
        }
        Commands::Config { init } => show_config_info(init)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::try_from_default_env().ok()
    } else {
        None
    };
    let filter =
        filter.unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn collect_facts(path: Option<&Path>) -> Result<HardwareFacts> {
    match path {
        Some(path) => FileFacts::new(path).collect(),
        None => SystemFacts.collect(),
    }
}

fn exit_on_violations(record: &BenchmarkRecord) {
    if !record.passed() {
        std::process::exit(EXIT_VIOLATIONS);
    }
}

/// Show configuration information
fn show_config_info(init: bool) -> Result<()> {
    println!("{}", "Preflight Bench Configuration\n".bright_cyan().bold());

    match config::get_config_path() {
        Ok(path) => {
            println!("{} {}", "Config file:".bright_yellow(), path.bright_white());
            if Path::new(&path).exists() {
                println!("  {} {}", "Status:".bright_cyan(), "Exists".bright_green());
            } else {
                println!(
                    "  {} {}",
                    "Status:".bright_cyan(),
                    "Not created yet (will use defaults)".bright_yellow()
                );
            }
        }
        Err(e) => {
            println!(
                "{} Could not determine config path: {}",
                "Error:".bright_red(),
                e
            );
        }
    }

    let cfg = if init {
        Config::init()?
    } else {
        Config::load()?
    };

    println!("\n{}", "CPU workloads:".bright_white().bold());
    println!(
        "  {} {}",
        "Sum units:".bright_cyan(),
        cfg.cpu.sum_units.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Factorial units:".bright_cyan(),
        cfg.cpu.factorial_units.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Timeout:".bright_cyan(),
        if cfg.cpu.timeout_secs == 0 {
            "disabled".bright_yellow()
        } else {
            format!("{}s", cfg.cpu.timeout_secs).bright_white()
        }
    );

    println!("\n{}", "Memory:".bright_white().bold());
    println!(
        "  {} {}",
        "Tiers:".bright_cyan(),
        format!("{:?}", cfg.memory.tiers).bright_white()
    );

    println!("\n{}", "Disk:".bright_white().bold());
    println!(
        "  {} {}",
        "Buffer:".bright_cyan(),
        format!("{} MiB", cfg.disk.buffer_mib).bright_white()
    );

    let req = &cfg.requirements;
    println!("\n{}", "Requirements:".bright_white().bold());
    println!(
        "  {} {}",
        "CPU:".bright_cyan(),
        format!("{} MHz, {} cores", req.min_cpu_mhz, req.min_physical_cores).bright_white()
    );
    println!(
        "  {} {}",
        "RAM:".bright_cyan(),
        format!("{} GB", req.min_ram_gb).bright_white()
    );
    println!(
        "  {} {}",
        "Free disk:".bright_cyan(),
        format!("{} GB per volume", req.min_free_disk_gb).bright_white()
    );
    println!(
        "  {} {}",
        "Machine type:".bright_cyan(),
        req.required_machine_type.bright_white()
    );

    Ok(())
}
