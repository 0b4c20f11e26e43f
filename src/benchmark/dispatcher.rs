//! Concurrent workload dispatcher.
//!
//! Splits `[0, total_units)` into one contiguous sub-range per worker and sums a per-unit work
//! function over each sub-range on tokio's blocking pool. Workers share nothing but a read-only
//! work function and a cancellation flag; each returns its partial sum by value.
//!
//! Sub-range `i` covers `[i * (T / N), (i + 1) * (T / N))`. When `T` is not divisible by `N` the
//! trailing `T % N` units are not dispatched.

use std::any::Any;
use std::collections::HashMap;
use std::hint::black_box;
use std::ops::{Add, Range};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::{Id, JoinSet};
use tracing::{debug, warn};

use super::error::BenchmarkError;

/// Units between two looks at the cancellation flag.
const CANCEL_CHECK_INTERVAL: u64 = 1 << 16;

/// Outcome of a successful dispatch
#[derive(Debug, Clone)]
pub struct Dispatched<R> {
    /// Sum of every worker's partial sum
    pub total: R,
    /// Wall clock from launching the first worker until the last one returned
    pub elapsed: Duration,
    /// Sub-ranges handed to the workers, in worker order
    pub ranges: Vec<Range<u64>>,
}

impl<R> Dispatched<R> {
    /// Number of units that were actually computed.
    pub fn covered_units(&self) -> u64 {
        self.ranges.iter().map(|r| r.end - r.start).sum()
    }
}

/// Fans a range-summing workload out to a fixed number of workers
#[derive(Debug, Clone)]
pub struct Dispatcher {
    workers: usize,
    timeout: Option<Duration>,
}

impl Dispatcher {
    /// Dispatcher with an explicit worker count (at least 1).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            timeout: None,
        }
    }

    /// Dispatcher with one worker per logical processor.
    pub fn detect() -> Self {
        Self::new(logical_processors())
    }

    /// Fail the dispatch when workers have not all returned within `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Sum `work(i)` over `[0, total_units)` across all workers.
    ///
    /// Waits for every worker; the first worker failure (a panic inside `work`) or the timeout
    /// fails the whole dispatch and no partial total is returned.
    pub async fn dispatch<R, F>(
        &self,
        total_units: u64,
        work: F,
    ) -> Result<Dispatched<R>, BenchmarkError>
    where
        R: Add<Output = R> + Default + Send + 'static,
        F: Fn(u64) -> R + Send + Sync + 'static,
    {
        let ranges = partition(total_units, self.workers);
        debug!(
            total_units,
            workers = self.workers,
            chunk = total_units / self.workers as u64,
            "Dispatching workload"
        );

        let work = Arc::new(work);
        let cancel = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();
        let mut worker_ids = HashMap::with_capacity(ranges.len());

        let started = Instant::now();
        for (worker, range) in ranges.iter().cloned().enumerate() {
            let work = Arc::clone(&work);
            let cancel = Arc::clone(&cancel);
            let handle = tasks.spawn_blocking(move || sum_range(range, work.as_ref(), &cancel));
            worker_ids.insert(handle.id(), worker);
        }

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, join_all(&mut tasks, &worker_ids))
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_secs = limit.as_secs_f64(), "Workers timed out");
                    Err(BenchmarkError::Timeout(limit))
                }
            },
            None => join_all(&mut tasks, &worker_ids).await,
        };
        let elapsed = started.elapsed();

        if joined.is_err() {
            // Blocking workers cannot be aborted; ask them to stop at the next check.
            cancel.store(true, Ordering::Relaxed);
            tasks.abort_all();
        }

        let total = joined?;
        debug!(elapsed_ms = elapsed.as_millis() as u64, "All workers joined");

        Ok(Dispatched {
            total,
            elapsed,
            ranges,
        })
    }
}

/// Split `[0, total)` into `workers` contiguous sub-ranges of `total / workers` units each.
pub fn partition(total: u64, workers: usize) -> Vec<Range<u64>> {
    let workers = workers.max(1) as u64;
    let chunk = total / workers;
    (0..workers).map(|i| i * chunk..(i + 1) * chunk).collect()
}

/// Logical processors available to this process (at least 1).
pub fn logical_processors() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn sum_range<R, F>(range: Range<u64>, work: &F, cancel: &AtomicBool) -> R
where
    R: Add<Output = R> + Default,
    F: Fn(u64) -> R,
{
    let mut acc = R::default();
    let mut next = range.start;
    while next < range.end {
        let chunk_end = range.end.min(next.saturating_add(CANCEL_CHECK_INTERVAL));
        for unit in next..chunk_end {
            acc = acc + work(black_box(unit));
        }
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        next = chunk_end;
    }
    acc
}

async fn join_all<R>(
    tasks: &mut JoinSet<R>,
    worker_ids: &HashMap<Id, usize>,
) -> Result<R, BenchmarkError>
where
    R: Add<Output = R> + Default + Send + 'static,
{
    let mut total = R::default();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, partial)) => total = total + partial,
            Err(err) => {
                let worker = worker_ids.get(&err.id()).copied().unwrap_or_default();
                if err.is_panic() {
                    let message = panic_message(err.into_panic());
                    return Err(BenchmarkError::WorkerFailed { worker, message });
                }
                return Err(BenchmarkError::Join(err.to_string()));
            }
        }
    }
    Ok(total)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
