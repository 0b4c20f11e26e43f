//! Benchmark error classification.
//!
//! Only the CPU stage can fail outright; memory and disk stages degrade into data instead.

use std::fmt;
use std::time::Duration;

/// Which engine stage produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cpu,
    Memory,
    Disk,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Cpu => "cpu",
            Stage::Memory => "memory",
            Stage::Disk => "disk",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while running benchmarks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BenchmarkError {
    #[error("Worker {worker} failed: {message}")]
    WorkerFailed { worker: usize, message: String },

    #[error("Workers did not finish within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Blocking task could not be joined: {0}")]
    Join(String),

    #[error("{stage} benchmark failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<BenchmarkError>,
    },
}

impl BenchmarkError {
    /// Attach the stage name to an error, leaving already-tagged errors as they are.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            tagged @ BenchmarkError::Stage { .. } => tagged,
            other => BenchmarkError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage that failed, if known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            BenchmarkError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether rerunning the stage may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BenchmarkError::Timeout(_) | BenchmarkError::Join(_) => true,
            BenchmarkError::WorkerFailed { .. } => false,
            BenchmarkError::Stage { source, .. } => source.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_wrapping_is_idempotent() {
        let err = BenchmarkError::Timeout(Duration::from_secs(5))
            .in_stage(Stage::Cpu)
            .in_stage(Stage::Disk);
        assert_eq!(err.stage(), Some(Stage::Cpu));
        assert_eq!(
            err.to_string(),
            "cpu benchmark failed: Workers did not finish within 5s"
        );
    }

    #[test]
    fn retryable_classification() {
        assert!(BenchmarkError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(BenchmarkError::Join("cancelled".into()).is_retryable());
        assert!(!BenchmarkError::WorkerFailed {
            worker: 0,
            message: "boom".into()
        }
        .is_retryable());
        assert!(BenchmarkError::Timeout(Duration::from_secs(1))
            .in_stage(Stage::Cpu)
            .is_retryable());
    }
}
