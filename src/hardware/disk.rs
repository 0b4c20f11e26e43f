//! Mounted volume enumeration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use sysinfo::Disks;

use super::bytes_to_gb;

/// A mounted volume the disk benchmark can target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    /// Device identifier (e.g., "/dev/nvme0n1p2", "C:\\")
    pub device: String,
    /// Where the volume is mounted
    pub mountpoint: PathBuf,
    /// Capacity in GB
    #[serde(default)]
    pub total_gb: f64,
    /// Free space in GB
    #[serde(default)]
    pub free_gb: f64,
    /// Used share of capacity, 0-100
    #[serde(default)]
    pub used_percent: f64,
}

impl Volume {
    pub fn from_bytes(device: String, mountpoint: PathBuf, total: u64, available: u64) -> Self {
        let used_percent = if total > 0 {
            ((total.saturating_sub(available)) as f64 / total as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        Volume {
            device,
            mountpoint,
            total_gb: bytes_to_gb(total),
            free_gb: bytes_to_gb(available),
            used_percent,
        }
    }
}

/// List mounted volumes, skipping pseudo filesystems with no capacity.
pub fn detect_volumes() -> Vec<Volume> {
    let disks = Disks::new_with_refreshed_list();

    disks
        .list()
        .iter()
        .filter(|disk| disk.total_space() > 0)
        .filter(|disk| !disk.mount_point().as_os_str().is_empty())
        .map(|disk| {
            let device = disk.name().to_string_lossy().trim().to_string();
            let mountpoint = disk.mount_point().to_path_buf();
            let device = if device.is_empty() {
                mountpoint.display().to_string()
            } else {
                device
            };
            Volume::from_bytes(
                device,
                mountpoint,
                disk.total_space(),
                disk.available_space(),
            )
        })
        .collect()
}
