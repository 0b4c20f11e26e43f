//! RAM detection module

use serde::{Deserialize, Serialize};
use sysinfo::System;

use super::bytes_to_gb;

/// RAM totals in GB (2 decimals)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RamFacts {
    /// Total usable RAM in GB
    #[serde(default)]
    pub total_gb: f64,
    /// RAM in use in GB
    #[serde(default)]
    pub used_gb: f64,
    /// RAM available for new allocations in GB
    #[serde(default)]
    pub available_gb: f64,
    /// Used share of total, 0-100
    #[serde(default)]
    pub used_percent: f64,
}

impl RamFacts {
    /// Detect RAM totals through sysinfo.
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        Self::from_bytes(
            sys.total_memory(),
            sys.used_memory(),
            sys.available_memory(),
        )
    }

    pub fn from_bytes(total: u64, used: u64, available: u64) -> Self {
        let used_percent = if total > 0 {
            (used as f64 / total as f64 * 100.0).round()
        } else {
            0.0
        };

        RamFacts {
            total_gb: bytes_to_gb(total),
            used_gb: bytes_to_gb(used),
            available_gb: bytes_to_gb(available),
            used_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_byte_counts() {
        let gib = 1024 * 1024 * 1024;
        let ram = RamFacts::from_bytes(16 * gib, 4 * gib, 12 * gib);
        assert_eq!(ram.total_gb, 16.0);
        assert_eq!(ram.used_gb, 4.0);
        assert_eq!(ram.available_gb, 12.0);
        assert_eq!(ram.used_percent, 25.0);
    }

    #[test]
    fn zero_total_has_zero_usage() {
        let ram = RamFacts::from_bytes(0, 0, 0);
        assert_eq!(ram.used_percent, 0.0);
    }
}
