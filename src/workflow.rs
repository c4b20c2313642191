//! High-level container that names a chain and reports its metrics.

use tracing::{info, info_span, Instrument};

use crate::chain::Chain;
use crate::{ChainMetrics, ChainResult, Result};

/// A named chain instance.
///
/// `Workflow` runs its chain inside a `tracing` span carrying the workflow
/// name, and returns the [`ChainResult`] together with its [`ChainMetrics`].
///
/// # Example
///
/// ```rust
/// use agent_chain::{EchoStep, SequentialChain, StepExt, Workflow};
///
/// # tokio_test::block_on(async {
/// let chain = SequentialChain::new(vec![EchoStep::new("A").boxed()]).unwrap();
/// let workflow = Workflow::new(chain).with_name("Echo");
///
/// let (result, metrics) = workflow.run("x").await.unwrap();
/// assert_eq!(result.outcomes.len(), 1);
/// assert_eq!(metrics.steps_completed, 1);
/// # });
/// ```
pub struct Workflow<C> {
    chain: C,
    name: String,
}

impl<C: Chain> Workflow<C> {
    /// Create a new workflow wrapping the given chain.
    pub fn new(chain: C) -> Self {
        Self {
            chain,
            name: "workflow".to_string(),
        }
    }

    /// Set a human-readable name for this workflow.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the name of this workflow.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the chain on `input`, returning the result and its metrics.
    pub async fn run(&self, input: &str) -> Result<(ChainResult, ChainMetrics)> {
        let span = info_span!("workflow", name = %self.name, strategy = ?self.chain.strategy());
        let result = self.chain.execute(input).instrument(span).await?;
        let metrics = result.metrics();
        info!(
            workflow = %self.name,
            steps = metrics.steps_completed,
            failures = metrics.failures,
            elapsed_ms = metrics.elapsed.as_millis() as u64,
            "workflow completed"
        );
        Ok((result, metrics))
    }

    /// Access the inner chain.
    pub fn inner(&self) -> &C {
        &self.chain
    }

    /// Consume the workflow, returning the inner chain.
    pub fn into_inner(self) -> C {
        self.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateFn;
    use crate::outcome::Strategy;
    use crate::{EchoStep, RetryingChain, SequentialChain, StepExt};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_metrics_count_attempts() {
        let calls = AtomicU32::new(0);
        let gate = GateFn::new(move |_: &serde_json::Value| {
            Ok(calls.fetch_add(1, Ordering::SeqCst) > 0)
        });
        let chain = RetryingChain::new(vec![EchoStep::new("A").boxed()], 3)
            .unwrap()
            .with_gate(gate);
        let workflow = Workflow::new(chain).with_name("Robust");
        assert_eq!(workflow.name(), "Robust");

        let (result, metrics) = workflow.run("x").await.unwrap();
        assert_eq!(result.strategy, Strategy::Retrying);
        assert_eq!(metrics.steps_completed, 1);
        assert_eq!(metrics.failures, 1);
        assert_eq!(metrics.attempts, 2);
        assert!(metrics.has_failures());
    }

    #[tokio::test]
    async fn test_boxed_chain() {
        let chain: Box<dyn Chain> = Box::new(
            SequentialChain::new(vec![EchoStep::new("A").boxed(), EchoStep::new("B").boxed()])
                .unwrap(),
        );
        let workflow = Workflow::new(chain);
        assert_eq!(workflow.inner().strategy(), Strategy::Sequential);
        let (result, _) = workflow.run("x").await.unwrap();
        assert_eq!(result.outcomes.len(), 2);
    }
}
