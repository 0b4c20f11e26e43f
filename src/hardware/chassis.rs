//! Machine type detection from the SMBIOS chassis code
//!
//! - Linux: /sys/class/dmi/id/chassis_type
//! - Windows: Win32_SystemEnclosure.ChassisTypes via PowerShell

#[cfg(target_os = "linux")]
use std::fs;
#[cfg(target_os = "windows")]
use std::process::Command;

pub const DESKTOP: &str = "Desktop";
pub const NOTEBOOK: &str = "Notebook";
pub const UNKNOWN: &str = "Unknown";

/// SMBIOS 3.x system enclosure type names (DSP0134, 7.4.1).
fn smbios_chassis_name(code: u32) -> Option<&'static str> {
    let name = match code {
        1 => "Other",
        3 => "Desktop",
        4 => "Low Profile Desktop",
        5 => "Pizza Box",
        6 => "Mini Tower",
        7 => "Tower",
        8 => "Portable",
        9 => "Laptop",
        10 => "Notebook",
        11 => "Hand Held",
        12 => "Docking Station",
        13 => "All in One",
        14 => "Sub Notebook",
        15 => "Space-Saving",
        16 => "Lunch Box",
        17 => "Main System Chassis",
        18 => "Expansion Chassis",
        19 => "SubChassis",
        20 => "Bus Expansion Chassis",
        21 => "Peripheral Chassis",
        22 => "RAID Chassis",
        23 => "Rack Mount Chassis",
        24 => "Sealed-case PC",
        25 => "Multi-system Chassis",
        26 => "Compact PCI",
        27 => "Advanced TCA",
        28 => "Blade",
        29 => "Blade Enclosure",
        30 => "Tablet",
        31 => "Convertible",
        32 => "Detachable",
        33 => "IoT Gateway",
        34 => "Embedded PC",
        35 => "Mini PC",
        36 => "Stick PC",
        _ => return None,
    };
    Some(name)
}

/// Map a chassis code to the machine category used by the requirement check.
///
/// Portable form factors collapse to "Notebook"; every other known enclosure keeps its
/// SMBIOS name, so only code 3 yields exactly "Desktop".
pub fn machine_type_from_code(code: u32) -> String {
    match smbios_chassis_name(code) {
        Some("Notebook" | "Laptop" | "Portable") => NOTEBOOK.to_string(),
        Some(name) => name.to_string(),
        None => UNKNOWN.to_string(),
    }
}

/// Detect the machine category, "Unknown" when the firmware does not say.
pub fn detect_machine_type() -> String {
    read_chassis_code()
        .map(machine_type_from_code)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

#[cfg(target_os = "linux")]
fn read_chassis_code() -> Option<u32> {
    fs::read_to_string("/sys/class/dmi/id/chassis_type")
        .ok()
        .and_then(|raw| raw.trim().parse::<u32>().ok())
}

#[cfg(target_os = "windows")]
fn read_chassis_code() -> Option<u32> {
    let output = Command::new("powershell")
        .args([
            "-NoProfile",
            "-Command",
            "(Get-CimInstance -ClassName Win32_SystemEnclosure).ChassisTypes | Select-Object -First 1",
        ])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find_map(|line| line.trim().parse::<u32>().ok())
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn read_chassis_code() -> Option<u32> {
    None
}
