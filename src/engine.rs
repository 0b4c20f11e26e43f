//! Benchmark engine
//!
//! Runs the CPU, memory and disk stages one after another against a read-only
//! [`HardwareFacts`] record, then scores the timings and validates the facts. Each stage is also
//! callable on its own so a caller can retry a single failed stage.

use chrono::Utc;
use colored::*;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::benchmark::{
    BenchmarkError, CpuOutcome, CpuTimings, DiskOutcome, DiskTimings, MemoryOutcome, Stage,
};
use crate::config::Config;
use crate::hardware::{HardwareFacts, Volume};
use crate::record::{BenchmarkRecord, TimingResult, SCORE_VERSION};
use crate::requirements::validate_requirements;
use crate::scoring::compute_scores;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub completed_steps: usize,
    pub total_steps: usize,
    pub status: String,
}

pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;

#[derive(Clone, Default)]
pub struct RunOptions {
    /// Suppress the stage lines on stdout.
    pub quiet: bool,
    /// Optional callback for progress updates.
    ///
    /// This receives progress events even when `quiet` is true.
    pub progress: Option<ProgressCallback>,
    /// Leave `TimingResult::memory` empty instead of stressing RAM.
    pub skip_memory: bool,
    /// Leave the disk timings empty.
    pub skip_disk: bool,
}

/// Steps of one run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Cpu,
    Memory,
    Disk,
    Scoring,
}

impl Step {
    fn label(self) -> &'static str {
        match self {
            Step::Cpu => "CPU benchmark",
            Step::Memory => "Memory benchmark",
            Step::Disk => "Disk benchmark",
            Step::Scoring => "Scoring",
        }
    }
}

/// Announces each step of a run to the callback and, unless quiet, to stdout.
struct StageProgress<'a> {
    options: &'a RunOptions,
    steps: Vec<Step>,
    done: usize,
}

impl<'a> StageProgress<'a> {
    fn new(options: &'a RunOptions) -> Self {
        let mut steps = vec![Step::Cpu];
        if !options.skip_memory {
            steps.push(Step::Memory);
        }
        if !options.skip_disk {
            steps.push(Step::Disk);
        }
        steps.push(Step::Scoring);
        Self {
            options,
            steps,
            done: 0,
        }
    }

    fn begin(&self, step: Step) {
        self.emit(step.label());
        if !self.options.quiet {
            println!(
                "   {} {}",
                format!("[{}/{}]", self.done + 1, self.steps.len()).bright_cyan(),
                step.label().bright_white()
            );
        }
    }

    fn finish(&mut self, step: Step, ok: bool) {
        self.done = (self.done + 1).min(self.steps.len());
        if !ok && !self.options.quiet {
            println!("   {} {} failed", "⚠".bright_yellow(), step.label());
        }
    }

    fn complete(&self) {
        self.emit("Benchmark complete");
        if !self.options.quiet {
            println!("   {}", "✓ Benchmark complete".bright_green());
        }
    }

    fn emit(&self, status: &str) {
        if let Some(on_progress) = self.options.progress.as_ref() {
            on_progress(ProgressUpdate {
                completed_steps: self.done,
                total_steps: self.steps.len(),
                status: status.to_string(),
            });
        }
    }
}

/// Runs benchmark stages with workload sizes and thresholds from a [`Config`].
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: Config,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Summation and factorial workloads across every worker.
    pub async fn run_cpu(&self) -> Result<CpuTimings, BenchmarkError> {
        self.config.cpu.benchmark().run().await
    }

    /// Memory stress on the blocking pool; tiers above `available_bytes` are skipped.
    pub async fn run_memory(
        &self,
        available_bytes: Option<u64>,
    ) -> Result<MemoryOutcome, BenchmarkError> {
        let bench = self.config.memory.benchmark(available_bytes);
        tokio::task::spawn_blocking(move || bench.run())
            .await
            .map_err(|e| BenchmarkError::Join(e.to_string()).in_stage(Stage::Memory))
    }

    /// Sequential per-volume disk timing on the blocking pool.
    pub async fn run_disk(&self, volumes: &[Volume]) -> Result<DiskTimings, BenchmarkError> {
        let bench = self.config.disk.benchmark();
        let volumes = volumes.to_vec();
        tokio::task::spawn_blocking(move || bench.run(&volumes))
            .await
            .map_err(|e| BenchmarkError::Join(e.to_string()).in_stage(Stage::Disk))
    }

    /// Run every enabled stage in order and build the record.
    ///
    /// A failing stage is recorded in the timings and the remaining stages still run.
    pub async fn run(&self, facts: &HardwareFacts, options: &RunOptions) -> BenchmarkRecord {
        let mut progress = StageProgress::new(options);

        progress.begin(Step::Cpu);
        let cpu = CpuOutcome::from(self.run_cpu().await);
        if let Some(error) = cpu.error() {
            warn!(error, "CPU stage failed, continuing with remaining stages");
        }
        progress.finish(Step::Cpu, cpu.succeeded());

        let memory = if options.skip_memory {
            info!("Memory benchmark skipped");
            None
        } else {
            progress.begin(Step::Memory);
            let outcome = self
                .run_memory(available_bytes(facts))
                .await
                .unwrap_or_else(|err| {
                    warn!(error = %err, "Memory stage failed");
                    MemoryOutcome::Exhausted
                });
            progress.finish(Step::Memory, outcome.succeeded());
            Some(outcome)
        };

        let disks = if options.skip_disk {
            info!("Disk benchmark skipped");
            DiskTimings::new()
        } else {
            progress.begin(Step::Disk);
            let timings = self.run_disk(&facts.volumes).await.unwrap_or_else(|err| {
                warn!(error = %err, "Disk stage failed");
                facts
                    .volumes
                    .iter()
                    .map(|v| (v.device.clone(), DiskOutcome::Failed))
                    .collect()
            });
            progress.finish(Step::Disk, true);
            timings
        };

        progress.begin(Step::Scoring);
        let record = self.assemble(facts.clone(), TimingResult::new(cpu, memory, disks));
        progress.finish(Step::Scoring, true);
        progress.complete();

        info!(
            run_id = %record.run_id,
            composite = record.scores.composite,
            violations = record.violations.len(),
            complete = record.complete(),
            "Benchmark run finished"
        );
        record
    }

    /// Score and validate externally supplied timings.
    pub fn assemble(&self, facts: HardwareFacts, timings: TimingResult) -> BenchmarkRecord {
        let scores = compute_scores(&facts, &timings);
        let violations = validate_requirements(&facts, &self.config.requirements);

        BenchmarkRecord {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            score_version: SCORE_VERSION.to_string(),
            facts,
            timings,
            scores,
            violations,
        }
    }

    /// Recompute scores and violations of a saved record, keeping its identity.
    pub fn reassess(&self, record: BenchmarkRecord) -> BenchmarkRecord {
        if record.score_version != SCORE_VERSION {
            warn!(
                recorded = %record.score_version,
                current = SCORE_VERSION,
                "Record was scored with a different version"
            );
        }

        let scores = compute_scores(&record.facts, &record.timings);
        let violations = validate_requirements(&record.facts, &self.config.requirements);
        BenchmarkRecord {
            score_version: SCORE_VERSION.to_string(),
            scores,
            violations,
            ..record
        }
    }
}

/// Collector-reported available RAM in bytes, when usable.
fn available_bytes(facts: &HardwareFacts) -> Option<u64> {
    let gb = facts.ram.available_gb;
    (gb.is_finite() && gb > 0.0).then(|| (gb * BYTES_PER_GB) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{CpuFacts, RamFacts};
    use std::sync::Mutex;

    fn tiny_config() -> Config {
        let mut config = Config::default();
        config.cpu.sum_units = 10_000;
        config.cpu.factorial_units = 1_000;
        config.cpu.workers = 2;
        config.memory.tiers = vec![4_096];
        config.memory.point_writes = 100;
        config.disk.buffer_mib = 1;
        config
    }

    fn facts() -> HardwareFacts {
        HardwareFacts {
            cpu: CpuFacts {
                name: "Test CPU".into(),
                physical_cores: Some(4),
                logical_threads: 8,
                max_frequency_mhz: Some(3000),
            },
            ram: RamFacts {
                total_gb: 8.0,
                used_gb: 4.0,
                available_gb: 4.0,
                used_percent: 50.0,
            },
            volumes: Vec::new(),
            machine_type: "Desktop".into(),
        }
    }

    #[test]
    fn assemble_scores_and_validates() {
        let engine = Engine::default();
        let mut disks = DiskTimings::new();
        disks.insert("a".into(), DiskOutcome::from_pair(0.4, 0.6));
        let timings = TimingResult {
            cpu: CpuOutcome::Measured {
                sum_seconds: 1.0,
                factorial_seconds: 0.05,
            },
            memory: Some(MemoryOutcome::Completed {
                elapsed_seconds: 0.5,
                tier: 50_000_000,
            }),
            disks,
        };

        let record = engine.assemble(facts(), timings);
        assert_eq!(record.scores.cpu, 10.0);
        assert_eq!(record.scores.ram, 10.0);
        assert_eq!(record.scores.disk, 10.0);
        assert_eq!(record.score_version, SCORE_VERSION);
        assert!(record.passed());
    }

    #[test]
    fn assemble_uses_configured_thresholds() {
        let mut config = Config::default();
        config.requirements.min_ram_gb = 16.0;
        let engine = Engine::new(config);

        let timings = TimingResult::new(
            CpuTimings {
                sum_seconds: 1.0,
                factorial_seconds: 0.05,
            },
            None,
            DiskTimings::new(),
        );
        let record = engine.assemble(facts(), timings);
        assert_eq!(record.violations.len(), 1);
        assert!(record.violations[0].contains("minimum 16 GB"));
    }

    #[test]
    fn reassess_keeps_identity() {
        let engine = Engine::default();
        let timings = TimingResult::new(
            CpuTimings {
                sum_seconds: 2.0,
                factorial_seconds: 0.1,
            },
            None,
            DiskTimings::new(),
        );
        let mut record = engine.assemble(facts(), timings);
        let original = record.clone();
        record.scores.composite = 0.0;
        record.violations.push("stale".into());

        let rescored = engine.reassess(record);
        assert_eq!(rescored, original);
    }

    #[test]
    fn available_bytes_ignores_unusable_values() {
        let mut facts = facts();
        assert_eq!(available_bytes(&facts), Some(4 * 1024 * 1024 * 1024));
        facts.ram.available_gb = f64::NAN;
        assert_eq!(available_bytes(&facts), None);
        facts.ram.available_gb = 0.0;
        assert_eq!(available_bytes(&facts), None);
    }

    #[tokio::test]
    async fn run_reports_progress_for_every_stage() {
        let engine = Engine::new(tiny_config());
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        let options = RunOptions {
            quiet: true,
            progress: Some(Arc::new(move |update: ProgressUpdate| {
                sink.lock().unwrap().push(update);
            })),
            skip_memory: false,
            skip_disk: false,
        };

        let record = engine.run(&facts(), &options).await;
        assert!(record.timings.memory.is_some_and(|m| m.succeeded()));
        assert!(record.timings.disks.is_empty());

        let updates = updates.lock().unwrap();
        let statuses: Vec<&str> = updates.iter().map(|u| u.status.as_str()).collect();
        assert_eq!(
            statuses,
            vec![
                "CPU benchmark",
                "Memory benchmark",
                "Disk benchmark",
                "Scoring",
                "Benchmark complete"
            ]
        );
        assert!(updates.iter().all(|u| u.total_steps == 4));
        let completed: Vec<usize> = updates.iter().map(|u| u.completed_steps).collect();
        assert_eq!(completed, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn failed_cpu_stage_is_recorded_and_run_continues() {
        let mut config = tiny_config();
        config.cpu.sum_units = u64::MAX / 4;
        config.cpu.workers = 1;
        config.cpu.timeout_secs = 1;
        let engine = Engine::new(config);

        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        let options = RunOptions {
            quiet: true,
            progress: Some(Arc::new(move |update: ProgressUpdate| {
                sink.lock().unwrap().push(update.status);
            })),
            skip_memory: false,
            skip_disk: true,
        };

        let record = engine.run(&facts(), &options).await;
        assert!(!record.timings.cpu.succeeded());
        assert!(record.timings.cpu.error().is_some_and(|e| e.contains("cpu")));
        assert!(record.timings.memory.is_some_and(|m| m.succeeded()));
        assert_eq!(record.scores.cpu, 0.0);
        assert!(!record.complete());
        assert!(updates.lock().unwrap().contains(&"Memory benchmark".to_string()));
    }

    #[tokio::test]
    async fn skipped_stages_leave_timings_empty() {
        let engine = Engine::new(tiny_config());
        let options = RunOptions {
            quiet: true,
            skip_memory: true,
            skip_disk: true,
            ..RunOptions::default()
        };

        let record = engine.run(&facts(), &options).await;
        assert_eq!(record.timings.memory, None);
        assert!(record.timings.disks.is_empty());
        assert!(record.scores.composite >= 0.0 && record.scores.composite <= 10.0);
    }
}
