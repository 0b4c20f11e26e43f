//! Score normalization.
//!
//! Maps raw timings and static facts to bounded 0-10 sub-scores and a weighted composite.
//! Every speed component has the shape `10 * sqrt(reference / elapsed)`: matching the reference
//! time scores 10, four times slower scores 5.
//!
//! The composite is computed from full-precision sub-scores and rounded on its own; the
//! reported sub-scores are rounded to 2 decimals for display only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::benchmark::{round_to, DiskOutcome};
use crate::hardware::HardwareFacts;
use crate::record::TimingResult;

pub const MAX_SCORE: f64 = 10.0;

/// Summation workload time that scores 10
pub const CPU_SUM_REFERENCE_SECS: f64 = 1.0;
/// Factorial workload time that scores 10
pub const CPU_FACTORIAL_REFERENCE_SECS: f64 = 0.05;
/// Write + read time of one volume that scores 10
pub const DISK_REFERENCE_SECS: f64 = 1.0;
/// Memory stress time that scores 10
pub const RAM_REFERENCE_SECS: f64 = 0.5;
/// Installed RAM that earns full capacity credit
pub const RAM_CAPACITY_REFERENCE_GB: f64 = 8.0;

const CPU_SUM_WEIGHT: f64 = 0.7;
const CPU_FACTORIAL_WEIGHT: f64 = 0.3;
const RAM_CAPACITY_WEIGHT: f64 = 0.5;
const RAM_VELOCITY_WEIGHT: f64 = 0.5;
const COMPOSITE_CPU_WEIGHT: f64 = 0.6;
const COMPOSITE_RAM_WEIGHT: f64 = 0.35;
const COMPOSITE_DISK_WEIGHT: f64 = 0.05;

/// Reported scores, each in [0, 10] with 2 decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub cpu: f64,
    pub ram: f64,
    pub disk: f64,
    pub composite: f64,
}

/// Full-precision intermediate values
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    /// Unclamped summation component
    pub cpu_sum: f64,
    /// Unclamped factorial component
    pub cpu_factorial: f64,
    pub cpu: f64,
    pub ram_capacity: f64,
    pub ram_velocity: f64,
    pub ram: f64,
    /// Score per device
    pub volumes: BTreeMap<String, f64>,
    pub disk: f64,
    pub composite: f64,
}

impl ScoreBreakdown {
    /// Round for reporting. The composite was already derived from unrounded values.
    pub fn to_result(&self) -> ScoreResult {
        ScoreResult {
            cpu: round_to(self.cpu, 2),
            ram: round_to(self.ram, 2),
            disk: round_to(self.disk, 2),
            composite: round_to(self.composite, 2),
        }
    }
}

/// Compute the reported scores for one run.
pub fn compute_scores(facts: &HardwareFacts, timings: &TimingResult) -> ScoreResult {
    score_breakdown(facts, timings).to_result()
}

/// Compute every intermediate score.
pub fn score_breakdown(facts: &HardwareFacts, timings: &TimingResult) -> ScoreBreakdown {
    let cpu_sum = speed_score(CPU_SUM_REFERENCE_SECS, timings.cpu.sum_seconds());
    let cpu_factorial = speed_score(CPU_FACTORIAL_REFERENCE_SECS, timings.cpu.factorial_seconds());
    let cpu = clamp_score(cpu_sum * CPU_SUM_WEIGHT + cpu_factorial * CPU_FACTORIAL_WEIGHT);

    let ram_capacity = capacity_score(facts.ram.total_gb);
    let ram_velocity = match &timings.memory {
        Some(outcome) => clamp_score(speed_score(RAM_REFERENCE_SECS, outcome.elapsed_seconds())),
        None => MAX_SCORE,
    };
    let ram = clamp_score(ram_capacity * RAM_CAPACITY_WEIGHT + ram_velocity * RAM_VELOCITY_WEIGHT);

    let volumes = volume_scores(facts, timings);
    let disk = if volumes.is_empty() {
        0.0
    } else {
        volumes.values().sum::<f64>() / volumes.len() as f64
    };

    let composite = clamp_score(
        cpu * COMPOSITE_CPU_WEIGHT + ram * COMPOSITE_RAM_WEIGHT + disk * COMPOSITE_DISK_WEIGHT,
    );

    ScoreBreakdown {
        cpu_sum,
        cpu_factorial,
        cpu,
        ram_capacity,
        ram_velocity,
        ram,
        volumes,
        disk,
        composite,
    }
}

/// Score of one volume's timing; failed volumes score 0.
pub fn disk_score(outcome: &DiskOutcome) -> f64 {
    match outcome {
        DiskOutcome::Measured {
            write_seconds,
            read_seconds,
        } => {
            let total = write_seconds + read_seconds;
            // A zero-length round trip is not a measurement.
            if total.is_nan() || total <= 0.0 {
                return 0.0;
            }
            clamp_score(speed_score(DISK_REFERENCE_SECS, total))
        }
        DiskOutcome::Failed => 0.0,
    }
}

/// Every listed or timed volume gets a score; a listed volume without a timing scores 0.
fn volume_scores(facts: &HardwareFacts, timings: &TimingResult) -> BTreeMap<String, f64> {
    let mut scores: BTreeMap<String, f64> = facts
        .volumes
        .iter()
        .map(|volume| (volume.device.clone(), 0.0))
        .collect();

    for (device, outcome) in &timings.disks {
        scores.insert(device.clone(), disk_score(outcome));
    }
    scores
}

/// `10 * sqrt(reference / elapsed)`, not clamped above. Unusable timings score 0.
fn speed_score(reference: f64, elapsed: f64) -> f64 {
    if elapsed.is_nan() || elapsed < 0.0 {
        return 0.0;
    }
    (MAX_SCORE * (reference / elapsed).sqrt()).max(0.0)
}

fn capacity_score(total_gb: f64) -> f64 {
    if total_gb.is_nan() || total_gb <= 0.0 {
        return 0.0;
    }
    clamp_score(total_gb / RAM_CAPACITY_REFERENCE_GB * MAX_SCORE)
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, MAX_SCORE)
}
