//! Synthetic benchmarks.
//!
//! - [`dispatcher`]: fan-out of a range-summing workload over the blocking pool
//! - [`cpu`]: summation and factorial workloads
//! - [`memory`]: tiered allocation and random-write stress
//! - [`disk`]: per-volume sequential write/read timing

pub mod cpu;
pub mod disk;
pub mod dispatcher;
pub mod error;
pub mod memory;

pub use cpu::{CpuBenchmark, CpuOutcome, CpuTimings};
pub use disk::{DiskBenchmark, DiskOutcome, DiskTimings};
pub use dispatcher::{Dispatched, Dispatcher};
pub use error::{BenchmarkError, Stage};
pub use memory::{MemoryBenchmark, MemoryOutcome};

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
