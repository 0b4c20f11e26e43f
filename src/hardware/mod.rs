//! Hardware facts
//!
//! The benchmark engine consumes a read-only [`HardwareFacts`] record. Collection lives behind
//! [`FactsSource`]: [`SystemFacts`] detects through sysinfo and platform files, [`FileFacts`]
//! reads a record produced by an external collector.

pub mod chassis;
pub mod cpu;
pub mod disk;
pub mod ram;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub use cpu::CpuFacts;
pub use disk::Volume;
pub use ram::RamFacts;

/// Everything the engine knows about the machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareFacts {
    pub cpu: CpuFacts,
    pub ram: RamFacts,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    /// Chassis category ("Desktop", "Notebook", "Unknown", ...)
    #[serde(default = "unknown_machine_type")]
    pub machine_type: String,
}

fn unknown_machine_type() -> String {
    chassis::UNKNOWN.to_string()
}

/// Source of hardware facts for a run
pub trait FactsSource {
    fn collect(&self) -> Result<HardwareFacts>;
}

/// Detects facts from the running system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFacts;

impl FactsSource for SystemFacts {
    fn collect(&self) -> Result<HardwareFacts> {
        let cpu = CpuFacts::detect().context("CPU detection failed")?;
        let ram = RamFacts::detect();
        let volumes = disk::detect_volumes();
        let machine_type = chassis::detect_machine_type();

        debug!(
            cpu = %cpu.name,
            threads = cpu.logical_threads,
            ram_gb = ram.total_gb,
            volumes = volumes.len(),
            machine_type = %machine_type,
            "Hardware facts collected"
        );

        Ok(HardwareFacts {
            cpu,
            ram,
            volumes,
            machine_type,
        })
    }
}

/// Reads facts from a JSON document
#[derive(Debug, Clone)]
pub struct FileFacts {
    pub path: PathBuf,
}

impl FileFacts {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FactsSource for FileFacts {
    fn collect(&self) -> Result<HardwareFacts> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read facts from {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse facts from {}", self.path.display()))
    }
}

/// Convert bytes to GB (1024^3) with 2 decimals
pub fn bytes_to_gb(bytes: u64) -> f64 {
    (bytes as f64 / 1024f64.powi(3) * 100.0).round() / 100.0
}
