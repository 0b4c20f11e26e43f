//! End-to-end runs of the engine with tiny workloads against scratch volumes.

use std::path::PathBuf;

use preflight_bench::benchmark::DiskOutcome;
use preflight_bench::hardware::{CpuFacts, FactsSource, FileFacts, RamFacts, Volume};
use preflight_bench::report;
use preflight_bench::{Config, Engine, HardwareFacts, RunOptions};
use tempfile::TempDir;

fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("preflight_bench=debug")
        .with_test_writer()
        .try_init();
}

fn tiny_config() -> Config {
    let mut config = Config::default();
    config.cpu.sum_units = 50_000;
    config.cpu.factorial_units = 5_000;
    config.cpu.workers = 3;
    config.memory.tiers = vec![usize::MAX, 8_192];
    config.memory.full_passes = 1;
    config.memory.point_writes = 1_000;
    config.disk.buffer_mib = 1;
    config
}

fn facts_with(volumes: Vec<Volume>) -> HardwareFacts {
    HardwareFacts {
        cpu: CpuFacts {
            name: "Integration CPU".into(),
            physical_cores: Some(6),
            logical_threads: 12,
            max_frequency_mhz: Some(3600),
        },
        ram: RamFacts {
            total_gb: 16.0,
            used_gb: 6.0,
            available_gb: 10.0,
            used_percent: 37.5,
        },
        volumes,
        machine_type: "Desktop".into(),
    }
}

fn volume(device: &str, mountpoint: PathBuf, free_gb: f64) -> Volume {
    Volume {
        device: device.into(),
        mountpoint,
        total_gb: 100.0,
        free_gb,
        used_percent: 100.0 - free_gb,
    }
}

#[tokio::test]
async fn full_run_scores_every_stage() {
    init_test_logging();
    let scratch = TempDir::new().unwrap();
    let facts = facts_with(vec![
        volume("scratch", scratch.path().to_path_buf(), 50.0),
        volume("missing", PathBuf::from("/no/such/mountpoint"), 50.0),
    ]);

    let engine = Engine::new(tiny_config());
    let options = RunOptions {
        quiet: true,
        ..RunOptions::default()
    };
    let record = engine.run(&facts, &options).await;

    let memory = record.timings.memory.expect("memory stage ran");
    assert_eq!(memory.tier_used(), 8_192);

    assert_eq!(record.timings.disks.len(), 2);
    assert!(matches!(
        record.timings.disks["scratch"],
        DiskOutcome::Measured { .. }
    ));
    assert_eq!(record.timings.disks["missing"], DiskOutcome::Failed);
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);

    for score in [
        record.scores.cpu,
        record.scores.ram,
        record.scores.disk,
        record.scores.composite,
    ] {
        assert!((0.0..=10.0).contains(&score), "score out of range: {score}");
    }
    assert!(record.passed(), "{:?}", record.violations);
    assert!(record.timings.cpu.succeeded());
}

#[tokio::test]
async fn cpu_timeout_still_returns_memory_and_disk_results() {
    init_test_logging();
    let scratch = TempDir::new().unwrap();
    let facts = facts_with(vec![volume("scratch", scratch.path().to_path_buf(), 50.0)]);

    let mut config = tiny_config();
    config.cpu.sum_units = u64::MAX / 4;
    config.cpu.workers = 1;
    config.cpu.timeout_secs = 1;
    let engine = Engine::new(config);
    let options = RunOptions {
        quiet: true,
        ..RunOptions::default()
    };
    let record = engine.run(&facts, &options).await;

    let error = record.timings.cpu.error().expect("cpu stage failed");
    assert!(error.contains("did not finish within 1s"), "{error}");
    assert_eq!(record.scores.cpu, 0.0);

    let memory = record.timings.memory.expect("memory stage ran");
    assert!(memory.succeeded());
    assert!(matches!(
        record.timings.disks["scratch"],
        DiskOutcome::Measured { .. }
    ));
    assert!(record.scores.ram > 0.0);
    assert!(record.scores.disk > 0.0);
    assert!(!record.complete());
    assert!(record.passed());
}

#[tokio::test]
async fn violations_do_not_block_scoring() {
    init_test_logging();
    let mut facts = facts_with(Vec::new());
    facts.cpu.max_frequency_mhz = Some(1600);
    facts.machine_type = "Notebook".into();

    let engine = Engine::new(tiny_config());
    let options = RunOptions {
        quiet: true,
        skip_memory: true,
        skip_disk: true,
        ..RunOptions::default()
    };
    let record = engine.run(&facts, &options).await;

    assert_eq!(record.violations.len(), 2);
    assert!(record.violations[0].starts_with("CPU below minimum"));
    assert!(record.violations[1].contains("detected: Notebook"));
    assert!(record.scores.composite > 0.0);
}

#[tokio::test]
async fn stages_can_be_retried_individually() {
    init_test_logging();
    let scratch = TempDir::new().unwrap();
    let engine = Engine::new(tiny_config());

    let first = engine.run_cpu().await.unwrap();
    let second = engine.run_cpu().await.unwrap();
    assert!(first.sum_seconds >= 0.0 && second.sum_seconds >= 0.0);

    let disks = engine
        .run_disk(&[volume("scratch", scratch.path().to_path_buf(), 50.0)])
        .await
        .unwrap();
    assert!(matches!(disks["scratch"], DiskOutcome::Measured { .. }));
}

#[tokio::test]
async fn saved_record_can_be_rescored_from_file_facts() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let facts_path = dir.path().join("facts.json");
    std::fs::write(
        &facts_path,
        serde_json::to_string(&facts_with(Vec::new())).unwrap(),
    )
    .unwrap();

    let facts = FileFacts::new(&facts_path).collect().unwrap();
    let engine = Engine::new(tiny_config());
    let options = RunOptions {
        quiet: true,
        skip_memory: true,
        skip_disk: true,
        ..RunOptions::default()
    };
    let record = engine.run(&facts, &options).await;

    let record_path = dir.path().join("record.json");
    report::write_json(&record, &record_path).unwrap();
    let saved = report::read_json(&record_path).unwrap();

    let rescored = engine.reassess(saved);
    assert_eq!(rescored.run_id, record.run_id);
    assert_eq!(rescored.violations, record.violations);
    assert!(report::render_text(&rescored).contains("all met"));
}
