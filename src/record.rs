//! Benchmark records handed to report writers and senders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::benchmark::{CpuOutcome, DiskOutcome, DiskTimings, MemoryOutcome};
use crate::hardware::HardwareFacts;
use crate::requirements::ValidationResult;
use crate::scoring::ScoreResult;

/// Version of the score semantics; bump when constants or weights change.
pub const SCORE_VERSION: &str = "1";

/// Raw timings of every stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingResult {
    /// Summation and factorial timings, or why the stage failed
    pub cpu: CpuOutcome,
    /// `None` when the memory stage was skipped
    #[serde(default)]
    pub memory: Option<MemoryOutcome>,
    /// Per-device disk timings
    #[serde(default)]
    pub disks: DiskTimings,
}

impl TimingResult {
    pub fn new(
        cpu: impl Into<CpuOutcome>,
        memory: Option<MemoryOutcome>,
        disks: DiskTimings,
    ) -> Self {
        Self {
            cpu: cpu.into(),
            memory,
            disks,
        }
    }
}

/// Everything one engine run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub score_version: String,
    pub facts: HardwareFacts,
    pub timings: TimingResult,
    pub scores: ScoreResult,
    pub violations: ValidationResult,
}

impl BenchmarkRecord {
    /// Whether every minimum requirement was met.
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Whether every stage that ran produced a measurement.
    pub fn complete(&self) -> bool {
        self.timings.cpu.succeeded()
            && self.timings.memory.map_or(true, |m| m.succeeded())
            && self
                .timings
                .disks
                .values()
                .all(|d| matches!(d, DiskOutcome::Measured { .. }))
    }
}
