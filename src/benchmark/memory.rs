//! Memory benchmark.
//!
//! Allocates a large `f64` buffer, overwrites every element with a fresh random value for a few
//! full passes, then performs point writes at uniformly random indices. Buffer sizes are tried
//! from an ordered tier list, largest first; the first tier that can be allocated is measured.
//! When no tier fits, the outcome is [`MemoryOutcome::Exhausted`] rather than an error.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::hint::black_box;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::round_to;

pub const DEFAULT_TIERS: [usize; 3] = [150_000_000, 100_000_000, 50_000_000];
pub const DEFAULT_FULL_PASSES: u32 = 3;
pub const DEFAULT_POINT_WRITES: usize = 1_000_000;

/// Result of the memory benchmark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MemoryOutcome {
    /// A tier was allocated and stressed
    Completed {
        /// Allocation plus all passes, seconds (3 decimals)
        elapsed_seconds: f64,
        /// Buffer length in elements
        tier: usize,
    },
    /// No tier could be allocated
    Exhausted,
}

impl MemoryOutcome {
    /// Elapsed seconds, `+inf` when exhausted.
    pub fn elapsed_seconds(&self) -> f64 {
        match self {
            MemoryOutcome::Completed {
                elapsed_seconds, ..
            } => *elapsed_seconds,
            MemoryOutcome::Exhausted => f64::INFINITY,
        }
    }

    /// Tier used, 0 when exhausted.
    pub fn tier_used(&self) -> usize {
        match self {
            MemoryOutcome::Completed { tier, .. } => *tier,
            MemoryOutcome::Exhausted => 0,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, MemoryOutcome::Completed { .. })
    }
}

/// Memory benchmark runner.
#[derive(Debug, Clone)]
pub struct MemoryBenchmark {
    /// Candidate buffer lengths in elements, tried in order.
    pub tiers: Vec<usize>,
    /// Full-buffer random write passes.
    pub full_passes: u32,
    /// Random-index writes after the full passes.
    pub point_writes: usize,
    /// Skip tiers whose buffer exceeds this many bytes.
    pub available_bytes: Option<u64>,
}

impl Default for MemoryBenchmark {
    fn default() -> Self {
        Self {
            tiers: DEFAULT_TIERS.to_vec(),
            full_passes: DEFAULT_FULL_PASSES,
            point_writes: DEFAULT_POINT_WRITES,
            available_bytes: None,
        }
    }
}

impl MemoryBenchmark {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tiers(mut self, tiers: Vec<usize>) -> Self {
        self.tiers = tiers;
        self
    }

    #[must_use]
    pub fn with_full_passes(mut self, passes: u32) -> Self {
        self.full_passes = passes;
        self
    }

    #[must_use]
    pub fn with_point_writes(mut self, writes: usize) -> Self {
        self.point_writes = writes;
        self
    }

    #[must_use]
    pub fn with_available_bytes(mut self, bytes: Option<u64>) -> Self {
        self.available_bytes = bytes;
        self
    }

    /// Run the benchmark on the first tier that fits.
    pub fn run(&self) -> MemoryOutcome {
        for &tier in &self.tiers {
            let bytes = (tier as u64).saturating_mul(std::mem::size_of::<f64>() as u64);
            if let Some(available) = self.available_bytes {
                if bytes > available {
                    debug!(tier, bytes, available, "Skipping tier larger than available RAM");
                    continue;
                }
            }

            match self.stress_tier(tier) {
                Some(elapsed_seconds) => {
                    info!(tier, elapsed_seconds, "Memory benchmark completed");
                    return MemoryOutcome::Completed {
                        elapsed_seconds,
                        tier,
                    };
                }
                None => debug!(tier, "Allocation failed, trying next tier"),
            }
        }

        warn!(tiers = ?self.tiers, "No memory tier could be allocated");
        MemoryOutcome::Exhausted
    }

    /// Allocate and stress one tier; `None` when the allocation is refused.
    fn stress_tier(&self, tier: usize) -> Option<f64> {
        if tier == 0 {
            return None;
        }

        let start = Instant::now();
        let mut buffer: Vec<f64> = Vec::new();
        buffer.try_reserve_exact(tier).ok()?;
        buffer.resize(tier, 0.0);

        let mut rng = rand::thread_rng();
        for pass in 0..self.full_passes {
            for slot in buffer.iter_mut() {
                *slot = rng.gen::<f64>();
            }
            debug!(tier, pass = pass + 1, "Full write pass complete");
        }

        for _ in 0..self.point_writes {
            let idx = rng.gen_range(0..buffer.len());
            buffer[idx] = rng.gen::<f64>();
        }

        black_box(&buffer);
        let elapsed = round_to(start.elapsed().as_secs_f64(), 3);
        Some(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fitting_tier_is_used() {
        let outcome = MemoryBenchmark::new()
            .with_tiers(vec![10_000, 5_000])
            .with_point_writes(1_000)
            .run();

        assert!(outcome.succeeded());
        assert_eq!(outcome.tier_used(), 10_000);
        assert!(outcome.elapsed_seconds().is_finite());
        assert!(outcome.elapsed_seconds() >= 0.0);
    }

    #[test]
    fn refused_allocation_falls_back_to_smaller_tier() {
        let outcome = MemoryBenchmark::new()
            .with_tiers(vec![usize::MAX, 4_096])
            .with_point_writes(100)
            .run();

        assert_eq!(outcome.tier_used(), 4_096);
    }

    #[test]
    fn tiers_above_available_ram_are_skipped() {
        let outcome = MemoryBenchmark::new()
            .with_tiers(vec![1_000_000, 1_000])
            .with_point_writes(10)
            .with_available_bytes(Some(64 * 1024))
            .run();

        assert_eq!(outcome.tier_used(), 1_000);
    }

    #[test]
    fn no_fitting_tier_is_exhausted() {
        let outcome = MemoryBenchmark::new().with_tiers(vec![usize::MAX, 0]).run();

        assert_eq!(outcome, MemoryOutcome::Exhausted);
        assert!(!outcome.succeeded());
        assert_eq!(outcome.tier_used(), 0);
        assert_eq!(outcome.elapsed_seconds(), f64::INFINITY);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_string(&MemoryOutcome::Exhausted).unwrap();
        assert_eq!(json, r#"{"status":"exhausted"}"#);

        let json = serde_json::to_string(&MemoryOutcome::Completed {
            elapsed_seconds: 1.25,
            tier: 50,
        })
        .unwrap();
        assert!(json.contains(r#""status":"completed""#));
        assert!(json.contains(r#""tier":50"#));
    }
}
