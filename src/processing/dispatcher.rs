//! Parallel dispatch of manifest rows over a bounded rayon pool

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use log::{debug, error, info, warn};
use rayon::prelude::*;

use crate::config::ProcessingConfig;
use crate::error::{SimulationError, Result};
use crate::manifest::ManifestEntry;
use super::common::progress_step;
use super::report::{BatchReport, SampleFailure};
use super::sample::SampleSimulator;

enum Outcome {
    Done,
    Skipped,
    Failed(SampleFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchDispatcher {
    workers: usize,
    chunk_size: usize,
    fail_fast: bool,
}

impl BatchDispatcher {
    pub fn new(workers: usize, chunk_size: usize) -> Self {
        Self { workers: workers.max(1), chunk_size: chunk_size.max(1), fail_fast: false }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(config.workers, config.chunk_size).with_fail_fast(config.fail_fast)
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Run `task` once per entry.
    ///
    /// Each chunk of `chunk_size` entries is handled sequentially by one
    /// worker. Failures (including panics) are recorded per sample; with
    /// fail-fast the first failure stops scheduling and is returned.
    pub fn submit<F>(&self, entries: &[ManifestEntry], task: F) -> Result<BatchReport>
    where
        F: Fn(&ManifestEntry) -> Result<()> + Sync,
    {
        let start = Instant::now();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("speechsim-worker-{}", i))
            .build()
            .map_err(|e| SimulationError::processing(format!("Cannot build worker pool: {}", e)))?;

        let total = entries.len();
        let step = progress_step(total);
        let completed = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);

        info!("Simulating {} samples with {} workers (chunk size {})", total, self.workers, self.chunk_size);

        let (abort, completed, task) = (&abort, &completed, &task);
        let outcomes: Vec<Outcome> = pool.install(|| {
            entries
                .par_chunks(self.chunk_size)
                .flat_map_iter(move |chunk| {
                    chunk.iter().map(move |entry| {
                        if abort.load(Ordering::Relaxed) {
                            return Outcome::Skipped;
                        }
                        let outcome = self.run_one(entry, task);
                        if matches!(outcome, Outcome::Failed(_)) && self.fail_fast {
                            abort.store(true, Ordering::Relaxed);
                        }

                        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                        if done % step == 0 || done == total {
                            info!("Progress: {}/{} ({:.0}%)", done, total, done as f64 * 100.0 / total as f64);
                        }
                        outcome
                    })
                })
                .collect()
        });

        let mut report = BatchReport {
            total,
            worker_count: self.workers,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Done => report.succeeded += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Failed(failure) => report.failures.push(failure),
            }
        }
        report.processing_time_secs = start.elapsed().as_secs_f64();

        if self.fail_fast {
            if let Some(first) = report.failures.first() {
                return Err(first.error.clone());
            }
        }
        Ok(report)
    }

    fn run_one<F>(&self, entry: &ManifestEntry, task: &F) -> Outcome
    where
        F: Fn(&ManifestEntry) -> Result<()> + Sync,
    {
        let result = panic::catch_unwind(AssertUnwindSafe(|| task(entry))).unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(SimulationError::processing(format!("worker panicked: {}", message)))
        });

        match result {
            Ok(()) => {
                debug!("[{}] done", entry.id);
                Outcome::Done
            }
            Err(e) => {
                match e {
                    SimulationError::Audio { .. } => warn!("Skipping {}: {}", entry.id, e),
                    _ => error!("Sample {} failed: {}", entry.id, e),
                }
                Outcome::Failed(SampleFailure { uid: entry.id.clone(), error: e })
            }
        }
    }

    /// Render and write every entry with `simulator`.
    pub fn run_simulation(&self, entries: &[ManifestEntry], simulator: &SampleSimulator<'_>) -> Result<BatchReport> {
        self.submit(entries, |entry| {
            let outcome = simulator.simulate(entry)?;
            debug!(
                "[{}] wrote {} frames{} in {} ms",
                outcome.uid,
                outcome.frames,
                if outcome.noise_written { " with noise" } else { "" },
                outcome.elapsed_ms
            );
            Ok(())
        })
    }
}
