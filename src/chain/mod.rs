//! Orchestration strategies.
//!
//! Each strategy drives a fixed set of [`Step`]s through a [`Context`] and
//! returns a [`ChainResult`]:
//!
//! - [`SequentialChain`]: strict order, no recovery
//! - [`ConditionalChain`]: draft, decide, run exactly one continuation
//! - [`RetryingChain`]: strict order with per-step validation and retries
//! - [`RecursiveMetaChain`]: produce, review, meta-validate
//!
//! Steps run one at a time; a chain never starts a step before the previous
//! run has finished.
//!
//! [`Context`]: crate::Context

use async_trait::async_trait;
use std::collections::HashSet;

use crate::outcome::{ChainResult, Strategy};
use crate::step::{BoxedStep, Step};
use crate::{Error, Result};

pub mod conditional;
pub mod meta;
pub mod retrying;
pub mod sequential;

pub use conditional::ConditionalChain;
pub use meta::RecursiveMetaChain;
pub use retrying::RetryingChain;
pub use sequential::SequentialChain;

/// An orchestration strategy that can be invoked with a task.
#[async_trait]
pub trait Chain: Send + Sync {
    /// Which strategy this is.
    fn strategy(&self) -> Strategy;

    /// Run the chain on `input`.
    ///
    /// A fatal failure is returned as [`Error::Aborted`], carrying the partial
    /// context and failure history.
    async fn execute(&self, input: &str) -> Result<ChainResult>;
}

#[async_trait]
impl Chain for Box<dyn Chain> {
    fn strategy(&self) -> Strategy {
        (**self).strategy()
    }

    async fn execute(&self, input: &str) -> Result<ChainResult> {
        (**self).execute(input).await
    }
}

/// Reject empty step lists, unnamed steps and duplicate names.
pub(crate) fn ensure_steps(steps: &[BoxedStep]) -> Result<()> {
    if steps.is_empty() {
        return Err(Error::Configuration(
            "a chain needs at least one step".into(),
        ));
    }
    let mut seen = HashSet::new();
    for step in steps {
        ensure_named(step.as_ref())?;
        if !seen.insert(step.name()) {
            return Err(Error::Configuration(format!(
                "duplicate step name '{}'",
                step.name()
            )));
        }
    }
    Ok(())
}

pub(crate) fn ensure_named(step: &dyn Step) -> Result<()> {
    if step.name().is_empty() {
        return Err(Error::Configuration("step names must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EchoStep, StepExt};

    #[test]
    fn test_ensure_steps() {
        assert!(matches!(ensure_steps(&[]), Err(Error::Configuration(_))));

        let dup = vec![EchoStep::new("A").boxed(), EchoStep::new("A").boxed()];
        let err = ensure_steps(&dup).unwrap_err();
        assert_eq!(err.detail(), "duplicate step name 'A'");

        let unnamed = vec![EchoStep::new("").boxed()];
        assert!(ensure_steps(&unnamed).is_err());

        let ok = vec![EchoStep::new("A").boxed(), EchoStep::new("B").boxed()];
        assert!(ensure_steps(&ok).is_ok());
    }
}
