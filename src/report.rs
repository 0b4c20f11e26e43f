//! Benchmark reports: boxed text for the terminal and pretty JSON on disk.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

use crate::benchmark::{CpuOutcome, DiskOutcome};
use crate::config::project_dirs;
use crate::hardware::HardwareFacts;
use crate::record::BenchmarkRecord;

const WIDTH: usize = 62;

/// Render a record as a boxed text report.
pub fn render_text(record: &BenchmarkRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!("╔{}╗\n", "═".repeat(WIDTH)));
    output.push_str(&format!("║{:^WIDTH$}║\n", "BENCHMARK REPORT"));
    output.push_str(&format!("╠{}╣\n", "═".repeat(WIDTH)));
    push_facts(&mut output, &record.facts);

    output.push_str(&separator());
    let timings = &record.timings;
    let cpu = match &timings.cpu {
        CpuOutcome::Measured {
            sum_seconds,
            factorial_seconds,
        } => format!("sum {sum_seconds:.3}s | factorial {factorial_seconds:.3}s"),
        CpuOutcome::Failed { error } => format!("failed: {error}"),
    };
    output.push_str(&format_line("CPU:  ", &cpu));
    let memory = match timings.memory {
        Some(outcome) if outcome.succeeded() => format!(
            "{:.3}s ({} elements)",
            outcome.elapsed_seconds(),
            outcome.tier_used()
        ),
        Some(_) => "no tier could be allocated".to_string(),
        None => "skipped".to_string(),
    };
    output.push_str(&format_line("RAM:  ", &memory));
    if timings.disks.is_empty() {
        output.push_str(&format_line("Disk: ", "skipped"));
    }
    for (device, outcome) in &timings.disks {
        let line = match outcome {
            DiskOutcome::Measured {
                write_seconds,
                read_seconds,
            } => format!("{device}: write {write_seconds:.3}s | read {read_seconds:.3}s"),
            DiskOutcome::Failed => format!("{device}: failed"),
        };
        output.push_str(&format_line("Disk: ", &line));
    }

    output.push_str(&separator());
    let scores = &record.scores;
    output.push_str(&format_line("CPU score:       ", &format!("{:.2}/10", scores.cpu)));
    output.push_str(&format_line("RAM score:       ", &format!("{:.2}/10", scores.ram)));
    output.push_str(&format_line("Disk score:      ", &format!("{:.2}/10", scores.disk)));
    output.push_str(&format_line(
        "Composite score: ",
        &format!("{:.2}/10", scores.composite),
    ));

    output.push_str(&separator());
    if record.violations.is_empty() {
        output.push_str(&format_line("Requirements: ", "all met"));
    } else {
        output.push_str(&format_line(
            "Requirements: ",
            &format!("{} not met", record.violations.len()),
        ));
        for violation in &record.violations {
            output.push_str(&format_line("  - ", violation));
        }
    }

    output.push_str(&format!("╚{}╝", "═".repeat(WIDTH)));
    output
}

/// Render collected facts in the same box style.
pub fn render_facts(facts: &HardwareFacts) -> String {
    let mut output = String::new();
    output.push_str(&format!("╔{}╗\n", "═".repeat(WIDTH)));
    output.push_str(&format!("║{:^WIDTH$}║\n", "SYSTEM INFORMATION"));
    output.push_str(&format!("╠{}╣\n", "═".repeat(WIDTH)));
    push_facts(&mut output, facts);
    output.push_str(&format!("╚{}╝", "═".repeat(WIDTH)));
    output
}

fn push_facts(output: &mut String, facts: &HardwareFacts) {
    let cpu = &facts.cpu;
    output.push_str(&format_line("CPU:  ", &cpu.name));
    let cores = cpu
        .physical_cores
        .map(|c| c.to_string())
        .unwrap_or_else(|| "?".to_string());
    output.push_str(&format_line(
        "      ",
        &format!("{} cores / {} threads", cores, cpu.logical_threads),
    ));
    if let Some(max_freq) = cpu.max_frequency_mhz {
        output.push_str(&format_line("      ", &format!("Max Clock: {} MHz", max_freq)));
    }

    let ram = &facts.ram;
    output.push_str(&format_line(
        "RAM:  ",
        &format!(
            "{:.2} GB ({:.2} GB available, {:.1}% used)",
            ram.total_gb, ram.available_gb, ram.used_percent
        ),
    ));

    for volume in &facts.volumes {
        output.push_str(&format_line(
            "Disk: ",
            &format!(
                "{} {} | {:.2} GB free of {:.2} GB",
                volume.device,
                volume.mountpoint.display(),
                volume.free_gb,
                volume.total_gb
            ),
        ));
    }

    output.push_str(&format_line("Type: ", &facts.machine_type));
}

fn separator() -> String {
    format!("╠{}╣\n", "═".repeat(WIDTH))
}

fn format_line(label: &str, content: &str) -> String {
    let content_width = WIDTH.saturating_sub(1);
    let label_len = label.chars().count();
    let room = content_width.saturating_sub(label_len);
    let content: String = content.chars().take(room).collect();
    format!("║ {label}{content:<room$}║\n")
}

/// Write the record as pretty JSON, creating parent directories.
pub fn write_json(record: &BenchmarkRecord, path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let json = serde_json::to_string_pretty(record).context("Failed to serialize report")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}

/// Write the text report, as printed by [`render_text`].
pub fn write_text(record: &BenchmarkRecord, path: &Path) -> Result<()> {
    ensure_parent(path)?;

    fs::write(path, render_text(record))
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}

/// Write `<stem>.json` and the text report as `<stem>.txt` beside it; returns the text path.
pub fn write_reports(record: &BenchmarkRecord, json_path: &Path) -> Result<PathBuf> {
    write_json(record, json_path)?;
    let text_path = json_path.with_extension("txt");
    write_text(record, &text_path)?;
    Ok(text_path)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Read a record written by [`write_json`].
pub fn read_json(path: &Path) -> Result<BenchmarkRecord> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read record from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse record from {}", path.display()))
}

/// `benchmark_report_<YYYYmmdd_HHMMSS>.json` in the data directory.
pub fn default_report_path() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    Ok(dirs.data_dir().join(report_file_name(Local::now())))
}

fn report_file_name<Tz: chrono::TimeZone>(now: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("benchmark_report_{}.json", now.format("%Y%m%d_%H%M%S"))
}
