// Worker pool - bounded fan-out of scoring jobs

pub mod constants;
mod panic_guard;
mod shutdown;

pub use panic_guard::{from_join, panic_message, JobOutcome};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use constants::PROGRESS_LOG_EVERY;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Runs jobs with at most `max_workers` in flight
///
/// Each job runs in its own tokio task so a panicking job is contained and
/// reported as `JobOutcome::Panicked`. Once shutdown is signalled no new job
/// is dispatched; jobs already running are allowed to finish.
pub struct WorkerPool {
    label: String,
    max_workers: usize,
    shutdown: ShutdownToken,
}

impl WorkerPool {
    pub fn new(label: impl Into<String>, max_workers: usize, shutdown: ShutdownToken) -> Self {
        Self {
            label: label.into(),
            max_workers: max_workers.max(1),
            shutdown,
        }
    }

    /// Run `job` over `items`; outcomes come back in input order
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, job: F) -> Vec<JobOutcome<T>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let total = items.len();
        let mut outcomes: Vec<JobOutcome<T>> = (0..total).map(|_| JobOutcome::Cancelled).collect();
        if total == 0 {
            return outcomes;
        }

        info!(
            stage = %self.label,
            jobs = total,
            workers = self.max_workers,
            "Dispatching jobs"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let job = Arc::new(job);
        let mut shutdown = self.shutdown.clone();
        let mut set: JoinSet<(usize, JobOutcome<T>)> = JoinSet::new();
        let mut completed = 0usize;

        for (index, item) in items.into_iter().enumerate() {
            if shutdown.is_shutdown() {
                warn!(stage = %self.label, dispatched = index, "Shutdown requested, not dispatching remaining jobs");
                break;
            }

            // Wait for a free worker, recording finished jobs meanwhile
            let permit = loop {
                tokio::select! {
                    biased;
                    _ = shutdown.wait() => break None,
                    Some(joined) = set.join_next(), if !set.is_empty() => {
                        self.record(joined, &mut outcomes, &mut completed, total);
                    }
                    permit = Arc::clone(&semaphore).acquire_owned() => break permit.ok(),
                }
            };
            let Some(permit) = permit else {
                warn!(stage = %self.label, dispatched = index, "Shutdown requested while waiting for a worker");
                break;
            };

            let job = Arc::clone(&job);
            let label = self.label.clone();
            set.spawn(async move {
                let _permit = permit;
                let handle = tokio::spawn((*job)(item));
                (index, from_join(&label, handle.await))
            });
        }

        while let Some(joined) = set.join_next().await {
            self.record(joined, &mut outcomes, &mut completed, total);
        }

        info!(stage = %self.label, completed, total, "Jobs finished");
        outcomes
    }

    fn record<T>(
        &self,
        joined: Result<(usize, JobOutcome<T>), tokio::task::JoinError>,
        outcomes: &mut [JobOutcome<T>],
        completed: &mut usize,
        total: usize,
    ) {
        match joined {
            Ok((index, outcome)) => {
                outcomes[index] = outcome;
                *completed += 1;
                if *completed % PROGRESS_LOG_EVERY == 0 {
                    info!(stage = %self.label, completed = *completed, total, "Progress");
                } else {
                    debug!(stage = %self.label, completed = *completed, total, "Job finished");
                }
            }
            // The wrapper task itself never panics; only runtime shutdown lands here
            Err(e) => warn!(stage = %self.label, error = %e, "Worker task aborted"),
        }
    }
}
