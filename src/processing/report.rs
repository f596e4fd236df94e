//! Batch outcome reporting

use std::collections::BTreeMap;
use std::fmt;

use crate::error::SimulationError;

/// A sample that did not produce outputs, and why.
#[derive(Debug, Clone)]
pub struct SampleFailure {
    pub uid: String,
    pub error: SimulationError,
}

impl SampleFailure {
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    /// Never attempted because a fail-fast run had already stopped.
    pub skipped: usize,
    pub failures: Vec<SampleFailure>,
    pub worker_count: usize,
    pub processing_time_secs: f64,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }

    pub fn failures_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn samples_per_sec(&self) -> f64 {
        if self.processing_time_secs > 0.0 {
            self.succeeded as f64 / self.processing_time_secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Simulation Report ===")?;
        writeln!(f, "Samples: {} total, {} succeeded, {} failed, {} skipped",
                 self.total, self.succeeded, self.failed(), self.skipped)?;
        writeln!(f, "Workers: {}", self.worker_count)?;
        write!(f, "Time: {:.2}s ({:.1} samples/s)", self.processing_time_secs, self.samples_per_sec())?;
        for (kind, count) in self.failures_by_kind() {
            write!(f, "\n  {}: {}", kind, count)?;
        }
        Ok(())
    }
}
