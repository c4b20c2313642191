//! Structured chain events for tracing and observability.
//!
//! Every invocation records a list of [`TraceEntry`] values alongside its
//! outcomes, so a caller can replay what happened without parsing logs.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::outcome::{Branch, FailureKind};

/// Events emitted while a chain runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ChainEvent {
    /// A step run has started.
    StepStart {
        /// Name of the step being executed.
        step_name: String,
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// A step run produced an outcome.
    StepEnd {
        /// Name of the step that completed.
        step_name: String,
        /// Attempt number, starting at 1.
        attempt: u32,
        /// Duration of execution in milliseconds.
        duration_ms: u64,
    },
    /// A validation gate rejected an outcome.
    GateRejected {
        step_name: String,
        attempt: u32,
        detail: String,
    },
    /// A conditional chain chose its continuation.
    BranchSelected {
        /// The branch taken.
        branch: Branch,
        /// The decision score.
        score: f64,
    },
    /// A recursive meta chain checked its review.
    MetaValidated {
        passed: bool,
    },
    /// A step or gate failed fatally.
    Error {
        /// Name of the step where the error occurred.
        step_name: String,
        /// Classification of the failure.
        kind: FailureKind,
        /// Error message describing what went wrong.
        message: String,
    },
}

/// A timestamped trace entry containing a chain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Unix epoch timestamp in milliseconds when this event occurred.
    pub timestamp: u64,
    /// The recorded event.
    #[serde(flatten)]
    pub event: ChainEvent,
}

impl TraceEntry {
    /// Create a new trace entry with the current timestamp.
    #[must_use]
    pub fn new(event: ChainEvent) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self { timestamp, event }
    }
}
