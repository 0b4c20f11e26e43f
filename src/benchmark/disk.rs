//! Disk benchmark.
//!
//! For each volume: create a scoped temporary directory under the mountpoint, write a fixed-size
//! zero buffer to a file (timed, including the flush to disk), read it back (timed), then let the
//! directory guard remove everything. Volumes run strictly one after another. Any failure on a
//! volume yields [`DiskOutcome::Failed`] for it and the next volume is tried.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::round_to;
use crate::hardware::Volume;

pub const DEFAULT_BUFFER_MIB: usize = 200;
pub const DEFAULT_DIR_PREFIX: &str = "preflight-bench-";
const FILE_NAME: &str = "benchmark_test_file.tmp";

/// Timing of one volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiskOutcome {
    Measured {
        write_seconds: f64,
        read_seconds: f64,
    },
    Failed,
}

impl DiskOutcome {
    /// `(write, read)` seconds, `(-1, -1)` for a failed volume.
    pub fn as_pair(&self) -> (f64, f64) {
        match self {
            DiskOutcome::Measured {
                write_seconds,
                read_seconds,
            } => (*write_seconds, *read_seconds),
            DiskOutcome::Failed => (-1.0, -1.0),
        }
    }

    /// Rebuild from a `(write, read)` pair; any `-1` (or unusable value) marks the volume failed.
    pub fn from_pair(write_seconds: f64, read_seconds: f64) -> Self {
        let usable = |v: f64| v.is_finite() && v >= 0.0;
        if usable(write_seconds) && usable(read_seconds) {
            DiskOutcome::Measured {
                write_seconds,
                read_seconds,
            }
        } else {
            DiskOutcome::Failed
        }
    }
}

/// Per-device timings, ordered by device
pub type DiskTimings = BTreeMap<String, DiskOutcome>;

/// Disk benchmark runner.
#[derive(Debug, Clone)]
pub struct DiskBenchmark {
    /// Size of the written file in MiB.
    pub buffer_mib: usize,
    /// Prefix of the scoped directory created under each mountpoint.
    pub dir_prefix: String,
}

impl Default for DiskBenchmark {
    fn default() -> Self {
        Self {
            buffer_mib: DEFAULT_BUFFER_MIB,
            dir_prefix: DEFAULT_DIR_PREFIX.to_string(),
        }
    }
}

impl DiskBenchmark {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_buffer_mib(mut self, mib: usize) -> Self {
        self.buffer_mib = mib;
        self
    }

    #[must_use]
    pub fn with_dir_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.dir_prefix = prefix.into();
        self
    }

    /// Test every volume in order; never fails as a whole.
    pub fn run(&self, volumes: &[Volume]) -> DiskTimings {
        let mut timings = DiskTimings::new();
        if volumes.is_empty() {
            return timings;
        }

        let Some(buffer) = self.allocate_buffer() else {
            warn!(
                buffer_mib = self.buffer_mib,
                volumes = volumes.len(),
                "Disk buffer could not be allocated, marking every volume failed"
            );
            for volume in volumes {
                timings.insert(volume.device.clone(), DiskOutcome::Failed);
            }
            return timings;
        };

        for volume in volumes {
            let outcome = match self.measure(&volume.mountpoint, &buffer) {
                Ok((write_seconds, read_seconds)) => {
                    info!(
                        device = %volume.device,
                        write_seconds,
                        read_seconds,
                        "Disk benchmark completed"
                    );
                    DiskOutcome::Measured {
                        write_seconds,
                        read_seconds,
                    }
                }
                Err(err) => {
                    warn!(
                        device = %volume.device,
                        mountpoint = %volume.mountpoint.display(),
                        error = %err,
                        "Disk benchmark failed"
                    );
                    DiskOutcome::Failed
                }
            };

            if timings.insert(volume.device.clone(), outcome).is_some() {
                debug!(device = %volume.device, "Device listed twice, keeping last result");
            }
        }

        timings
    }

    /// Zeroed write buffer; `None` when the size overflows or the allocation is refused.
    fn allocate_buffer(&self) -> Option<Vec<u8>> {
        let len = self.buffer_mib.checked_mul(1024 * 1024)?;
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(len).ok()?;
        buffer.resize(len, 0u8);
        Some(buffer)
    }

    fn measure(&self, mountpoint: &Path, buffer: &[u8]) -> io::Result<(f64, f64)> {
        if !mountpoint.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("mountpoint {} is not a directory", mountpoint.display()),
            ));
        }

        let dir = tempfile::Builder::new()
            .prefix(&self.dir_prefix)
            .tempdir_in(mountpoint)?;
        let path = dir.path().join(FILE_NAME);

        let write_start = Instant::now();
        {
            let mut file = File::create(&path)?;
            file.write_all(buffer)?;
            file.sync_data()?;
        }
        let write_seconds = round_to(write_start.elapsed().as_secs_f64(), 3);

        let read_start = Instant::now();
        let mut file = File::open(&path)?;
        let mut chunk = vec![0u8; 1024 * 1024];
        let mut read_total = 0usize;
        loop {
            let n = file.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            read_total += n;
        }
        let read_seconds = round_to(read_start.elapsed().as_secs_f64(), 3);
        drop(file);

        if read_total != buffer.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("read back {read_total} of {} bytes", buffer.len()),
            ));
        }

        // Explicit close so removal errors surface; dropping would swallow them.
        dir.close()?;
        Ok((write_seconds, read_seconds))
    }
}
