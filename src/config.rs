//! Configuration management for preflight-bench
//!
//! Config file location:
//! - Linux: ~/.config/preflight-bench/config.toml
//! - macOS: ~/Library/Application Support/com.preflight.preflight-bench/config.toml
//! - Windows: %APPDATA%/preflight/preflight-bench/config/config.toml
//!
//! You can override the config location by setting `PREFLIGHT_BENCH_CONFIG_PATH`.

use anyhow::{ensure, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::benchmark::cpu::{DEFAULT_FACTORIAL_MODULUS, DEFAULT_FACTORIAL_UNITS, DEFAULT_SUM_UNITS};
use crate::benchmark::disk::{DEFAULT_BUFFER_MIB, DEFAULT_DIR_PREFIX};
use crate::benchmark::memory::{DEFAULT_FULL_PASSES, DEFAULT_POINT_WRITES, DEFAULT_TIERS};
use crate::benchmark::{CpuBenchmark, DiskBenchmark, MemoryBenchmark};
use crate::requirements::Requirements;

const CONFIG_PATH_ENV: &str = "PREFLIGHT_BENCH_CONFIG_PATH";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// CPU workload sizes
    #[serde(default)]
    pub cpu: CpuConfig,

    /// Memory stress tiers
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Disk write/read settings
    #[serde(default)]
    pub disk: DiskConfig,

    /// Minimum requirement thresholds
    #[serde(default)]
    pub requirements: Requirements,
}

impl Config {
    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from an explicit path; a missing file yields defaults.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config: Self = match fs::read_to_string(config_path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {}", config_path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config from {}", config_path.display()))
            }
        };

        config
            .validate()
            .with_context(|| format!("Invalid config in {}", config_path.display()))?;
        Ok(config)
    }

    /// Reject settings no benchmark stage can run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.cpu.factorial_modulus > 0, "cpu.factorial_modulus must be at least 1");
        ensure!(!self.memory.tiers.is_empty(), "memory.tiers must list at least one tier");
        ensure!(
            self.memory.tiers.iter().all(|&t| t > 0),
            "memory.tiers must not contain 0"
        );
        ensure!(self.disk.buffer_mib > 0, "disk.buffer_mib must be at least 1");
        ensure!(
            !self.disk.dir_prefix.trim().is_empty(),
            "disk.dir_prefix must not be empty"
        );
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Write through a temp file in the same directory, then rename over the target.
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        let dir = match config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent,
            None => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let toml = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        let mut staged = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to stage config in {}", dir.display()))?;
        staged
            .write_all(toml.as_bytes())
            .context("Failed to write staged config")?;
        staged
            .persist(config_path)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        let proj_dirs = project_dirs()?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Create default config file if it doesn't exist
    pub fn init() -> Result<Self> {
        let config = Self::load()?;

        let config_path = Self::config_path()?;
        if !config_path.exists() {
            config.save()?;
        }

        Ok(config)
    }
}

pub(crate) fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "preflight", "preflight-bench")
        .context("Could not determine project directories")
}

/// CPU benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuConfig {
    /// Units for the summation-of-squares workload
    #[serde(default = "default_sum_units")]
    pub sum_units: u64,

    /// Units for the bounded factorial workload
    #[serde(default = "default_factorial_units")]
    pub factorial_units: u64,

    /// Factorial argument bound
    #[serde(default = "default_factorial_modulus")]
    pub factorial_modulus: u64,

    /// Per-workload deadline in seconds, 0 disables
    #[serde(default = "default_cpu_timeout")]
    pub timeout_secs: u64,

    /// Worker count, 0 uses every logical processor
    #[serde(default)]
    pub workers: usize,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            sum_units: default_sum_units(),
            factorial_units: default_factorial_units(),
            factorial_modulus: default_factorial_modulus(),
            timeout_secs: default_cpu_timeout(),
            workers: 0,
        }
    }
}

impl CpuConfig {
    pub fn benchmark(&self) -> CpuBenchmark {
        CpuBenchmark::new()
            .with_sum_units(self.sum_units)
            .with_factorial_units(self.factorial_units)
            .with_factorial_modulus(self.factorial_modulus)
            .with_timeout((self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)))
            .with_workers((self.workers > 0).then_some(self.workers))
    }
}

fn default_sum_units() -> u64 {
    DEFAULT_SUM_UNITS
}

fn default_factorial_units() -> u64 {
    DEFAULT_FACTORIAL_UNITS
}

fn default_factorial_modulus() -> u64 {
    DEFAULT_FACTORIAL_MODULUS
}

fn default_cpu_timeout() -> u64 {
    300
}

/// Memory benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Buffer lengths in f64 elements, largest first
    #[serde(default = "default_tiers")]
    pub tiers: Vec<usize>,

    #[serde(default = "default_full_passes")]
    pub full_passes: u32,

    #[serde(default = "default_point_writes")]
    pub point_writes: usize,

    /// Skip tiers larger than the reported available RAM
    #[serde(default = "default_true")]
    pub respect_available_ram: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            full_passes: default_full_passes(),
            point_writes: default_point_writes(),
            respect_available_ram: true,
        }
    }
}

impl MemoryConfig {
    /// Benchmark limited to `available_bytes` when the config asks for it.
    pub fn benchmark(&self, available_bytes: Option<u64>) -> MemoryBenchmark {
        MemoryBenchmark::new()
            .with_tiers(self.tiers.clone())
            .with_full_passes(self.full_passes)
            .with_point_writes(self.point_writes)
            .with_available_bytes(available_bytes.filter(|_| self.respect_available_ram))
    }
}

fn default_tiers() -> Vec<usize> {
    DEFAULT_TIERS.to_vec()
}

fn default_full_passes() -> u32 {
    DEFAULT_FULL_PASSES
}

fn default_point_writes() -> usize {
    DEFAULT_POINT_WRITES
}

fn default_true() -> bool {
    true
}

/// Disk benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskConfig {
    /// Written file size in MiB
    #[serde(default = "default_buffer_mib")]
    pub buffer_mib: usize,

    /// Prefix of the scratch directory created on each volume
    #[serde(default = "default_dir_prefix")]
    pub dir_prefix: String,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            buffer_mib: default_buffer_mib(),
            dir_prefix: default_dir_prefix(),
        }
    }
}

impl DiskConfig {
    pub fn benchmark(&self) -> DiskBenchmark {
        DiskBenchmark::new()
            .with_buffer_mib(self.buffer_mib)
            .with_dir_prefix(self.dir_prefix.clone())
    }
}

fn default_buffer_mib() -> usize {
    DEFAULT_BUFFER_MIB
}

fn default_dir_prefix() -> String {
    DEFAULT_DIR_PREFIX.to_string()
}

/// Get configuration file path for display purposes
pub fn get_config_path() -> Result<String> {
    let path = Config::config_path()?;
    Ok(path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cpu.sum_units, 1_000_000_000);
        assert_eq!(config.cpu.factorial_units, 3_000_000);
        assert_eq!(config.cpu.factorial_modulus, 500);
        assert_eq!(config.cpu.timeout_secs, 300);
        assert_eq!(config.memory.tiers, vec![150_000_000, 100_000_000, 50_000_000]);
        assert_eq!(config.memory.full_passes, 3);
        assert!(config.memory.respect_available_ram);
        assert_eq!(config.disk.buffer_mib, 200);
        assert_eq!(config.requirements.min_cpu_mhz, 1800);
        assert_eq!(config.requirements.required_machine_type, "Desktop");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();

        assert!(toml.contains("[cpu]"));
        assert!(toml.contains("sum_units"));
        assert!(toml.contains("[memory]"));
        assert!(toml.contains("[disk]"));
        assert!(toml.contains("[requirements]"));
        assert!(toml.contains("min_free_disk_gb"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [cpu]
            sum_units = 1000
            workers = 2

            [requirements]
            min_ram_gb = 8.0
            "#,
        )
        .unwrap();

        assert_eq!(config.cpu.sum_units, 1000);
        assert_eq!(config.cpu.workers, 2);
        assert_eq!(config.cpu.factorial_units, 3_000_000);
        assert_eq!(config.requirements.min_ram_gb, 8.0);
        assert_eq!(config.requirements.min_cpu_mhz, 1800);
        assert_eq!(config.disk, DiskConfig::default());
    }

    #[test]
    fn save_then_load_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.disk.buffer_mib = 16;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cpu\nsum_units = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn unusable_settings_are_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[memory]\ntiers = []\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
        assert!(format!("{err:#}").contains("memory.tiers must list at least one tier"));

        fs::write(&path, "[disk]\nbuffer_mib = 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("disk.buffer_mib"));
    }

    #[test]
    fn save_replaces_existing_file_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "stale").unwrap();

        Config::default().save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn zero_values_disable_timeout_and_detect_workers() {
        let cpu = CpuConfig {
            timeout_secs: 0,
            workers: 0,
            ..CpuConfig::default()
        };
        let bench = cpu.benchmark();
        assert_eq!(bench.timeout, None);
        assert_eq!(bench.workers, None);

        let bench = CpuConfig {
            workers: 3,
            ..CpuConfig::default()
        }
        .benchmark();
        assert_eq!(bench.timeout, Some(Duration::from_secs(300)));
        assert_eq!(bench.workers, Some(3));
    }

    #[test]
    fn available_ram_limit_follows_flag() {
        let memory = MemoryConfig::default();
        assert_eq!(memory.benchmark(Some(1024)).available_bytes, Some(1024));

        let memory = MemoryConfig {
            respect_available_ram: false,
            ..MemoryConfig::default()
        };
        assert_eq!(memory.benchmark(Some(1024)).available_bytes, None);
    }
}
