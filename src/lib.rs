//! Preflight Bench - hardware benchmark and scoring engine
//!
//! Times a fixed set of synthetic CPU, memory and disk workloads, turns the timings into
//! normalized 0-10 scores and checks the machine against minimum requirements.

pub mod benchmark;
pub mod config;
pub mod engine;
pub mod hardware;
pub mod record;
pub mod report;
pub mod requirements;
pub mod scoring;

pub use benchmark::{BenchmarkError, Stage};
pub use config::Config;
pub use engine::{Engine, ProgressUpdate, RunOptions};
pub use hardware::{FactsSource, FileFacts, HardwareFacts, SystemFacts};
pub use record::{BenchmarkRecord, TimingResult};
pub use requirements::{validate_requirements, Requirements, ValidationResult};
pub use scoring::{compute_scores, ScoreResult};
