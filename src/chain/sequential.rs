//! Strict sequential composition.

use async_trait::async_trait;

use crate::aggregate::Aggregator;
use crate::outcome::{ChainMetadata, ChainResult, Strategy};
use crate::step::BoxedStep;
use crate::{Context, Result};
use super::{ensure_steps, Chain};

/// Runs steps strictly in order, threading the context forward.
///
/// Each step sees every earlier step's output under `<name>_output`. Any
/// failure aborts the chain immediately; nothing is retried.
///
/// # Example
///
/// ```rust
/// use agent_chain::{Chain, EchoStep, SequentialChain, StepExt};
///
/// # tokio_test::block_on(async {
/// let chain = SequentialChain::new(vec![
///     EchoStep::new("Designer").boxed(),
///     EchoStep::new("Reviewer").boxed(),
/// ]).unwrap();
///
/// let result = chain.execute("a medieval betrayal").await.unwrap();
/// assert_eq!(result.outcomes.len(), 2);
/// assert!(result.context.contains_key("Designer_output"));
/// assert!(result.context.contains_key("Reviewer_output"));
/// # });
/// ```
pub struct SequentialChain {
    steps: Vec<BoxedStep>,
}

impl SequentialChain {
    /// Create a chain over `steps`.
    ///
    /// Fails if `steps` is empty or two steps share a name.
    pub fn new(steps: Vec<BoxedStep>) -> Result<Self> {
        ensure_steps(&steps)?;
        Ok(Self { steps })
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.name())
    }
}

#[async_trait]
impl Chain for SequentialChain {
    fn strategy(&self) -> Strategy {
        Strategy::Sequential
    }

    async fn execute(&self, input: &str) -> Result<ChainResult> {
        let mut agg = Aggregator::new(Strategy::Sequential);
        let mut ctx = Context::with_input(input);

        for step in &self.steps {
            let outcome = match agg.invoke(step.as_ref(), &ctx, 1).await {
                Ok(outcome) => outcome,
                Err(failure) => return Err(agg.abort(failure, ctx)),
            };
            if let Err(failure) = agg.commit(&mut ctx, outcome) {
                return Err(agg.abort(failure, ctx));
            }
        }

        Ok(agg.finish(ctx, ChainMetadata::None))
    }
}
