//! CPU benchmark.
//!
//! Two workloads run through the [`Dispatcher`]:
//! - **Summation of squares**: `f(i) = i * i`, cheap integer work per unit
//! - **Bounded factorial**: `f(i) = (i mod M + 1)!` in floating point, far heavier per unit
//!
//! Each returns elapsed wall-clock seconds (3 decimals); the totals are kept as checksums.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::dispatcher::Dispatcher;
use super::error::{BenchmarkError, Stage};
use super::round_to;

pub const DEFAULT_SUM_UNITS: u64 = 1_000_000_000;
pub const DEFAULT_FACTORIAL_UNITS: u64 = 3_000_000;
pub const DEFAULT_FACTORIAL_MODULUS: u64 = 500;

/// Timings of one CPU benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpuTimings {
    /// Summation workload, seconds
    pub sum_seconds: f64,
    /// Factorial workload, seconds
    pub factorial_seconds: f64,
}

/// CPU stage result as recorded in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CpuOutcome {
    Measured {
        sum_seconds: f64,
        factorial_seconds: f64,
    },
    /// The stage timed out or a worker failed; the rest of the run went on
    Failed { error: String },
}

impl CpuOutcome {
    /// Summation seconds, `+inf` when the stage failed.
    pub fn sum_seconds(&self) -> f64 {
        match self {
            CpuOutcome::Measured { sum_seconds, .. } => *sum_seconds,
            CpuOutcome::Failed { .. } => f64::INFINITY,
        }
    }

    /// Factorial seconds, `+inf` when the stage failed.
    pub fn factorial_seconds(&self) -> f64 {
        match self {
            CpuOutcome::Measured {
                factorial_seconds, ..
            } => *factorial_seconds,
            CpuOutcome::Failed { .. } => f64::INFINITY,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, CpuOutcome::Measured { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CpuOutcome::Measured { .. } => None,
            CpuOutcome::Failed { error } => Some(error),
        }
    }
}

impl From<CpuTimings> for CpuOutcome {
    fn from(timings: CpuTimings) -> Self {
        CpuOutcome::Measured {
            sum_seconds: timings.sum_seconds,
            factorial_seconds: timings.factorial_seconds,
        }
    }
}

impl From<Result<CpuTimings, BenchmarkError>> for CpuOutcome {
    fn from(result: Result<CpuTimings, BenchmarkError>) -> Self {
        match result {
            Ok(timings) => timings.into(),
            Err(err) => CpuOutcome::Failed {
                error: err.to_string(),
            },
        }
    }
}

/// Checksums produced alongside the timings, for verification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuChecksums {
    pub sum_total: u128,
    pub factorial_total: f64,
}

/// CPU benchmark runner with configurable workload sizes.
#[derive(Debug, Clone)]
pub struct CpuBenchmark {
    /// Units for the summation workload.
    pub sum_units: u64,
    /// Units for the factorial workload.
    pub factorial_units: u64,
    /// Bound on the factorial argument.
    pub factorial_modulus: u64,
    /// Per-workload deadline; `None` waits forever.
    pub timeout: Option<Duration>,
    /// Worker count; `None` uses every logical processor.
    pub workers: Option<usize>,
}

impl Default for CpuBenchmark {
    fn default() -> Self {
        Self {
            sum_units: DEFAULT_SUM_UNITS,
            factorial_units: DEFAULT_FACTORIAL_UNITS,
            factorial_modulus: DEFAULT_FACTORIAL_MODULUS,
            timeout: Some(Duration::from_secs(300)),
            workers: None,
        }
    }
}

impl CpuBenchmark {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sum_units(mut self, units: u64) -> Self {
        self.sum_units = units;
        self
    }

    #[must_use]
    pub fn with_factorial_units(mut self, units: u64) -> Self {
        self.factorial_units = units;
        self
    }

    #[must_use]
    pub fn with_factorial_modulus(mut self, modulus: u64) -> Self {
        self.factorial_modulus = modulus.max(1);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    fn dispatcher(&self) -> Dispatcher {
        let dispatcher = match self.workers {
            Some(workers) => Dispatcher::new(workers),
            None => Dispatcher::detect(),
        };
        dispatcher.with_timeout(self.timeout)
    }

    /// Run both workloads and return their timings.
    pub async fn run(&self) -> Result<CpuTimings, BenchmarkError> {
        self.run_with_checksums().await.map(|(timings, _)| timings)
    }

    /// Run both workloads, also returning the grand totals.
    pub async fn run_with_checksums(&self) -> Result<(CpuTimings, CpuChecksums), BenchmarkError> {
        let dispatcher = self.dispatcher();
        info!(
            workers = dispatcher.workers(),
            sum_units = self.sum_units,
            factorial_units = self.factorial_units,
            "Starting CPU benchmark"
        );

        let sum = dispatcher
            .dispatch(self.sum_units, square)
            .await
            .map_err(|e| e.in_stage(Stage::Cpu))?;
        let sum_seconds = round_to(sum.elapsed.as_secs_f64(), 3);
        debug!(sum_seconds, covered = sum.covered_units(), "Summation workload complete");

        let modulus = self.factorial_modulus.max(1);
        let factorial = dispatcher
            .dispatch(self.factorial_units, move |i| bounded_factorial(i, modulus))
            .await
            .map_err(|e| e.in_stage(Stage::Cpu))?;
        let factorial_seconds = round_to(factorial.elapsed.as_secs_f64(), 3);
        debug!(
            factorial_seconds,
            covered = factorial.covered_units(),
            "Factorial workload complete"
        );

        info!(sum_seconds, factorial_seconds, "CPU benchmark completed");

        Ok((
            CpuTimings {
                sum_seconds,
                factorial_seconds,
            },
            CpuChecksums {
                sum_total: sum.total,
                factorial_total: factorial.total,
            },
        ))
    }
}

fn square(i: u64) -> u128 {
    let i = i as u128;
    i * i
}

/// `((i mod modulus) + 1)!` as f64; saturates to infinity past 170!.
pub fn bounded_factorial(i: u64, modulus: u64) -> f64 {
    factorial((i % modulus) + 1)
}

/// `n!` as f64.
pub fn factorial(n: u64) -> f64 {
    (2..=n).fold(1.0, |acc, k| acc * k as f64)
}
