//! Minimum requirement validation.
//!
//! Basic checks cover CPU clock and cores, installed RAM and free space per volume; the advanced
//! check recommends a desktop chassis. Unknown values fail their check.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::hardware::HardwareFacts;

/// Violation messages, basic checks first; empty means every requirement is met.
pub type ValidationResult = Vec<String>;

/// Thresholds the facts are checked against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default = "default_min_cpu_mhz")]
    pub min_cpu_mhz: u64,

    #[serde(default = "default_min_physical_cores")]
    pub min_physical_cores: usize,

    #[serde(default = "default_min_ram_gb")]
    pub min_ram_gb: f64,

    #[serde(default = "default_min_free_disk_gb")]
    pub min_free_disk_gb: f64,

    #[serde(default = "default_required_machine_type")]
    pub required_machine_type: String,
}

impl Default for Requirements {
    fn default() -> Self {
        Self {
            min_cpu_mhz: default_min_cpu_mhz(),
            min_physical_cores: default_min_physical_cores(),
            min_ram_gb: default_min_ram_gb(),
            min_free_disk_gb: default_min_free_disk_gb(),
            required_machine_type: default_required_machine_type(),
        }
    }
}

fn default_min_cpu_mhz() -> u64 {
    1800
}

fn default_min_physical_cores() -> usize {
    2
}

fn default_min_ram_gb() -> f64 {
    4.0
}

fn default_min_free_disk_gb() -> f64 {
    1.0
}

fn default_required_machine_type() -> String {
    "Desktop".to_string()
}

/// Run basic then advanced checks.
pub fn validate_requirements(facts: &HardwareFacts, requirements: &Requirements) -> ValidationResult {
    let mut violations = check_basic(facts, requirements);
    violations.extend(check_advanced(facts, requirements));
    violations
}

/// CPU, RAM and per-volume free space.
pub fn check_basic(facts: &HardwareFacts, requirements: &Requirements) -> ValidationResult {
    let mut violations = Vec::new();

    let freq = facts.cpu.max_frequency_mhz;
    let cores = facts.cpu.physical_cores;
    let freq_ok = freq.is_some_and(|mhz| mhz >= requirements.min_cpu_mhz);
    let cores_ok = cores.is_some_and(|n| n >= requirements.min_physical_cores);
    if !(freq_ok && cores_ok) {
        violations.push(format!(
            "CPU below minimum: {} MHz and {} cores (minimum {} MHz and {} cores)",
            or_unknown(freq),
            or_unknown(cores),
            requirements.min_cpu_mhz,
            requirements.min_physical_cores
        ));
    }

    // Negated comparisons so NaN fails.
    let ram_gb = facts.ram.total_gb;
    if !(ram_gb >= requirements.min_ram_gb) {
        violations.push(format!(
            "Insufficient RAM: {} GB (minimum {} GB)",
            ram_gb, requirements.min_ram_gb
        ));
    }

    for volume in &facts.volumes {
        if !(volume.free_gb >= requirements.min_free_disk_gb) {
            violations.push(format!(
                "Low free disk space on {} ({}): {} GB (minimum {} GB)",
                volume.device,
                volume.mountpoint.display(),
                volume.free_gb,
                requirements.min_free_disk_gb
            ));
        }
    }

    violations
}

/// Machine type recommendation.
pub fn check_advanced(facts: &HardwareFacts, requirements: &Requirements) -> ValidationResult {
    if facts.machine_type == requirements.required_machine_type {
        return Vec::new();
    }
    vec![format!(
        "{} machine recommended, detected: {}",
        requirements.required_machine_type, facts.machine_type
    )]
}

fn or_unknown<T: Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
