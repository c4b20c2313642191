//! Records produced by chain invocations.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::events::TraceEntry;
use crate::gate::Verdict;
use crate::metrics::ChainMetrics;

/// What a step produced on a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Name of the step that produced this outcome.
    pub step: String,
    /// The output payload, opaque to the core.
    pub payload: serde_json::Value,
    /// Measured wall-clock time of the run.
    pub elapsed: Duration,
    /// The step's declared nominal latency.
    pub nominal_latency: Duration,
    /// Which attempt produced this outcome, starting at 1.
    pub attempt: u32,
}

/// Classification of a [`Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The step could not produce an outcome at all.
    Execution,
    /// An outcome was produced but failed a local validation gate.
    Validation,
    /// A review outcome failed the meta-validation gate.
    MetaValidation,
}

impl FailureKind {
    /// Whether this failure came from a gate rather than from execution.
    #[must_use]
    pub fn is_validation(self) -> bool {
        matches!(self, FailureKind::Validation | FailureKind::MetaValidation)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Execution => "execution",
            FailureKind::Validation => "validation",
            FailureKind::MetaValidation => "meta-validation",
        })
    }
}

/// A classified failure from one step run or gate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// What kind of failure this was.
    pub kind: FailureKind,
    /// Name of the step the failure is attributed to.
    pub step: String,
    /// The attempt that failed, starting at 1.
    pub attempt: u32,
    /// Human-readable detail.
    pub detail: String,
}

impl Failure {
    /// Create a failure record.
    pub fn new(
        kind: FailureKind,
        step: impl Into<String>,
        attempt: u32,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            step: step.into(),
            attempt,
            detail: detail.into(),
        }
    }
}

/// The orchestration strategy that produced a [`ChainResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Sequential,
    Conditional,
    Retrying,
    RecursiveMeta,
}

/// The continuation a conditional chain selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Accept,
    Reject,
}

impl Branch {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Branch::Accept => "accept",
            Branch::Reject => "reject",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<&str> for Branch {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Strategy-specific facts about an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainMetadata {
    /// Sequential and retrying chains carry nothing extra.
    None,
    /// The conditional chain's decision.
    Branch {
        /// Which continuation ran.
        taken: Branch,
        /// The verdict that selected it.
        verdict: Verdict,
    },
    /// The recursive meta chain's gate verdict.
    Meta {
        /// Whether meta-validation passed.
        passed: bool,
    },
}

/// The aggregate returned from a successful chain invocation.
///
/// Each invocation builds its own result; nothing is shared with other runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResult {
    /// The strategy that ran.
    pub strategy: Strategy,
    /// The final context.
    pub context: Context,
    /// Outcomes in the order their steps executed.
    pub outcomes: Vec<Outcome>,
    /// Failures recovered from along the way, in attempt order.
    pub failures: Vec<Failure>,
    /// Strategy-specific metadata.
    pub metadata: ChainMetadata,
    /// Structured event trace of the invocation.
    pub trace: Vec<TraceEntry>,
    /// Summed wall-clock time of every step run, rejected attempts included.
    pub step_time: Duration,
    /// Total wall-clock time of the invocation.
    pub elapsed: Duration,
}

impl ChainResult {
    /// The branch a conditional chain took.
    #[must_use]
    pub fn branch_taken(&self) -> Option<Branch> {
        match &self.metadata {
            ChainMetadata::Branch { taken, .. } => Some(*taken),
            _ => None,
        }
    }

    /// The verdict a conditional chain acted on.
    #[must_use]
    pub fn verdict(&self) -> Option<&Verdict> {
        match &self.metadata {
            ChainMetadata::Branch { verdict, .. } => Some(verdict),
            _ => None,
        }
    }

    /// The meta-validation verdict of a recursive meta chain.
    #[must_use]
    pub fn meta_validation_passed(&self) -> Option<bool> {
        match &self.metadata {
            ChainMetadata::Meta { passed } => Some(*passed),
            _ => None,
        }
    }

    /// The outcome recorded for `step`, if it ran.
    #[must_use]
    pub fn outcome(&self, step: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.step == step)
    }

    /// The first outcome: the draft of a conditional chain, the design of a
    /// recursive meta chain.
    #[must_use]
    pub fn first_outcome(&self) -> Option<&Outcome> {
        self.outcomes.first()
    }

    /// The last outcome produced.
    #[must_use]
    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.outcomes.last()
    }

    /// Failures attributed to `step`.
    pub fn failures_for<'a>(&'a self, step: &'a str) -> impl Iterator<Item = &'a Failure> + 'a {
        self.failures.iter().filter(move |f| f.step == step)
    }

    /// Performance accounting for this invocation.
    #[must_use]
    pub fn metrics(&self) -> ChainMetrics {
        ChainMetrics::from_result(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_names() {
        assert_eq!(Branch::Accept, "accept");
        assert_eq!(Branch::Reject.to_string(), "reject");
        assert_eq!(serde_json::to_string(&Branch::Reject).unwrap(), "\"reject\"");
    }

    #[test]
    fn test_failure_kind_classification() {
        assert!(FailureKind::Validation.is_validation());
        assert!(FailureKind::MetaValidation.is_validation());
        assert!(!FailureKind::Execution.is_validation());
        assert_eq!(
            serde_json::to_string(&FailureKind::MetaValidation).unwrap(),
            "\"meta_validation\""
        );
    }
}
