//! # agent-chain
//!
//! An orchestration core for composing agent steps into pipelines.
//!
//! A [`Step`] consumes a shared [`Context`] and produces a JSON payload. A
//! chain strategy decides how steps are ordered, how their outputs propagate
//! through the context, how failures are classified and retried, and what
//! the caller gets back in the [`ChainResult`].
//!
//! ## Core Concepts
//!
//! - **Step**: An atomic, stateless unit of work
//! - **Context**: Ordered, write-once key-value accumulator
//! - **Outcome / Failure**: Records of a step run
//! - **SequentialChain**: Strict in-order execution
//! - **ConditionalChain**: Draft, score, run one of two continuations
//! - **RetryingChain**: Per-step validation gate with a bounded retry budget
//! - **RecursiveMetaChain**: Produce, review, meta-validate
//! - **ChainResult**: Outcomes, failure history and strategy metadata
//!
//! ## Example: Retrying Chain
//!
//! ```rust
//! use agent_chain::{Chain, EchoStep, Error, RetryingChain, StepExt};
//! use agent_chain::gate::GateFn;
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! # tokio_test::block_on(async {
//! // Reject the first two outputs, accept the third.
//! let checks = AtomicU32::new(0);
//! let gate = GateFn::new(move |_: &serde_json::Value| {
//!     if checks.fetch_add(1, Ordering::SeqCst) < 2 {
//!         return Err(Error::Validation("bad".into()));
//!     }
//!     Ok(true)
//! });
//!
//! let chain = RetryingChain::new(vec![EchoStep::new("A").boxed()], 3)
//!     .unwrap()
//!     .with_gate(gate);
//!
//! let result = chain.execute("x").await.unwrap();
//! assert_eq!(result.failures.len(), 2);
//! assert_eq!(result.outcome("A").unwrap().attempt, 3);
//! # });
//! ```

pub mod aggregate;
pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod gate;
pub mod metrics;
pub mod outcome;
pub mod step;
pub mod workflow;

pub use error::{ChainAbort, Error, Result};
pub use context::{Context, ContextValue};
pub use config::ChainPolicy;
pub use metrics::ChainMetrics;
pub use events::{ChainEvent, TraceEntry};
pub use outcome::{Branch, ChainMetadata, ChainResult, Failure, FailureKind, Outcome, Strategy};
pub use gate::{DecisionPredicate, ValidationGate, Verdict};
pub use workflow::Workflow;

// Re-export step and chain types
pub use step::{BoxedStep, EchoStep, LambdaStep, Step, StepExt};
pub use chain::{Chain, ConditionalChain, RecursiveMetaChain, RetryingChain, SequentialChain};
