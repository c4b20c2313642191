//! Performance accounting for chain invocations.
//!
//! Nominal step latency never influences orchestration; it only shows up
//! here, next to the measured step time and the orchestration overhead.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::outcome::ChainResult;

/// Aggregated statistics for one chain invocation.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainMetrics {
    /// Number of steps that produced an accepted outcome.
    pub steps_completed: usize,
    /// Number of step runs, including failed attempts.
    pub attempts: usize,
    /// Number of recovered failures.
    pub failures: usize,
    /// Sum of measured step run times, rejected attempts included.
    pub step_time: Duration,
    /// Sum of declared nominal latencies of completed steps.
    pub nominal_latency: Duration,
    /// Total wall-clock time of the invocation.
    pub elapsed: Duration,
}

impl ChainMetrics {
    /// Compute metrics from a finished result.
    #[must_use]
    pub fn from_result(result: &ChainResult) -> Self {
        Self {
            steps_completed: result.outcomes.len(),
            attempts: result.outcomes.len() + result.failures.len(),
            failures: result.failures.len(),
            step_time: result.step_time,
            nominal_latency: result.outcomes.iter().map(|o| o.nominal_latency).sum(),
            elapsed: result.elapsed,
        }
    }

    /// Check if there were any recovered failures.
    pub fn has_failures(&self) -> bool {
        self.failures > 0
    }

    /// Time spent outside of step runs.
    pub fn overhead(&self) -> Duration {
        self.elapsed.saturating_sub(self.step_time)
    }

    /// Overhead as a fraction of step time, or `None` if no step time was
    /// recorded.
    pub fn overhead_ratio(&self) -> Option<f64> {
        let step_secs = self.step_time.as_secs_f64();
        (step_secs > 0.0).then(|| self.overhead().as_secs_f64() / step_secs)
    }
}
