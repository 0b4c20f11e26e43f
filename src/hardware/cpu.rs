//! CPU detection module
//!
//! Detects CPU information using:
//! - Cross-platform: sysinfo crate
//! - Linux: cpufreq sysfs for the maximum clock
//! - Windows: WMI (`wmic`), registry as fallback

use anyhow::Result;
use serde::{Deserialize, Serialize};
#[cfg(target_os = "linux")]
use std::fs;
#[cfg(target_os = "windows")]
use std::process::Command;
use sysinfo::System;

/// CPU facts consumed by scoring and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuFacts {
    /// CPU name (e.g., "AMD Ryzen 7 5800X")
    pub name: String,
    /// Number of physical cores, if the platform reports it
    #[serde(default)]
    pub physical_cores: Option<usize>,
    /// Number of logical threads
    #[serde(default)]
    pub logical_threads: usize,
    /// Max turbo/boost frequency in MHz (if available)
    #[serde(default)]
    pub max_frequency_mhz: Option<u64>,
}

impl CpuFacts {
    /// Detect CPU information (platform-specific)
    pub fn detect() -> Result<Self> {
        let mut sys = System::new();
        sys.refresh_cpu_all();

        let cpus = sys.cpus();
        if cpus.is_empty() {
            anyhow::bail!("No CPU detected");
        }

        let first_cpu = &cpus[0];
        let name = first_cpu.brand().trim().to_string();
        let current_mhz = first_cpu.frequency();

        let logical_threads = cpus.len();
        let physical_cores = sys.physical_core_count();

        #[cfg(target_os = "linux")]
        let max_frequency_mhz = Self::linux_max_frequency_mhz();

        #[cfg(target_os = "windows")]
        let max_frequency_mhz = Self::windows_max_frequency_mhz();

        #[cfg(not(any(target_os = "linux", target_os = "windows")))]
        let max_frequency_mhz: Option<u64> = None;

        // sysinfo only knows the current clock; better than nothing when the max is hidden.
        let max_frequency_mhz = max_frequency_mhz.or((current_mhz > 0).then_some(current_mhz));

        Ok(CpuFacts {
            name,
            physical_cores,
            logical_threads,
            max_frequency_mhz,
        })
    }

    /// Read the hardware max frequency from cpufreq (kHz in sysfs)
    #[cfg(target_os = "linux")]
    fn linux_max_frequency_mhz() -> Option<u64> {
        const CANDIDATES: [&str; 2] = [
            "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq",
            "/sys/devices/system/cpu/cpu0/cpufreq/scaling_max_freq",
        ];

        CANDIDATES.iter().find_map(|path| {
            fs::read_to_string(path)
                .ok()
                .and_then(|raw| parse_khz_as_mhz(&raw))
        })
    }

    /// Get the max clock from Windows WMI, falling back to the registry
    #[cfg(target_os = "windows")]
    fn windows_max_frequency_mhz() -> Option<u64> {
        if let Ok(output) = Command::new("wmic")
            .args(["cpu", "get", "MaxClockSpeed", "/format:csv"])
            .output()
        {
            if output.status.success() {
                let stdout = String::from_utf8_lossy(&output.stdout);
                // CSV: Node,MaxClockSpeed (skip header)
                for line in stdout.lines().skip(1) {
                    let parts: Vec<&str> = line.split(',').collect();
                    if let Some(Ok(freq)) = parts.get(1).map(|p| p.trim().parse::<u64>()) {
                        return Some(freq);
                    }
                }
            }
        }

        let output = Command::new("reg")
            .args([
                "query",
                "HKEY_LOCAL_MACHINE\\HARDWARE\\DESCRIPTION\\System\\CentralProcessor\\0",
                "/v",
                "~MHz",
            ])
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }

        // Parse: "    ~MHz    REG_DWORD    0x1e61"
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .filter(|line| line.contains("~MHz"))
            .filter_map(|line| line.split_whitespace().last())
            .find_map(|hex| u64::from_str_radix(hex.trim_start_matches("0x"), 16).ok())
    }
}

/// Parse a cpufreq value (kHz) into MHz.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_khz_as_mhz(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|khz| *khz > 0)
        .map(|khz| khz / 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cpufreq_khz() {
        assert_eq!(parse_khz_as_mhz("4200000\n"), Some(4200));
        assert_eq!(parse_khz_as_mhz("0"), None);
        assert_eq!(parse_khz_as_mhz("n/a"), None);
    }

    #[test]
    fn missing_fields_deserialize_as_unknown() {
        let cpu: CpuFacts = serde_json::from_str(r#"{"name":"Test CPU"}"#).unwrap();
        assert_eq!(cpu.physical_cores, None);
        assert_eq!(cpu.max_frequency_mhz, None);
        assert_eq!(cpu.logical_threads, 0);
    }
}
