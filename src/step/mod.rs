//! Core step trait and stock step types.
//!
//! This module defines the [`Step`] trait, the atomic unit every chain
//! drives, along with [`LambdaStep`] for closure-based steps and
//! [`EchoStep`] for stand-in agents.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::{Context, Result};

pub mod echo;

pub use echo::EchoStep;

/// A boxed, type-erased step as stored by the chains.
pub type BoxedStep = Box<dyn Step>;

/// An atomic unit of work over a [`Context`].
///
/// Steps are stateless with respect to the chain: everything they need comes
/// from the context they are handed. A step signals an unusable output by
/// returning [`Error::Validation`](crate::Error::Validation); any other error
/// is treated as an execution failure.
///
/// # Example
///
/// ```rust
/// use agent_chain::{Context, Step};
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
///
/// struct Shout;
///
/// #[async_trait]
/// impl Step for Shout {
///     fn name(&self) -> &str { "Shout" }
///
///     async fn run(&self, ctx: &Context) -> agent_chain::Result<Value> {
///         let input = ctx.input().unwrap_or_default();
///         Ok(json!({"result": input.to_uppercase()}))
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let out = Shout.run(&Context::with_input("hi")).await.unwrap();
/// assert_eq!(out["result"], "HI");
/// # });
/// ```
#[async_trait]
pub trait Step: Send + Sync {
    /// Unique name of this step within a chain.
    fn name(&self) -> &str;

    /// Declared nominal latency. Used for performance accounting only.
    fn latency(&self) -> Duration {
        Duration::ZERO
    }

    /// Execute this step against the provided context.
    async fn run(&self, ctx: &Context) -> Result<serde_json::Value>;
}

#[async_trait]
impl Step for BoxedStep {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn latency(&self) -> Duration {
        (**self).latency()
    }

    async fn run(&self, ctx: &Context) -> Result<serde_json::Value> {
        (**self).run(ctx).await
    }
}

/// A named step constructed from an async closure.
///
/// The closure receives an owned snapshot of the context.
///
/// # Example
///
/// ```rust
/// use agent_chain::{Context, LambdaStep, Step};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let step = LambdaStep::new("Count", |ctx: Context| async move {
///     Ok::<_, agent_chain::Error>(json!({"result": ctx.len()}))
/// });
/// let out = step.run(&Context::with_input("x")).await.unwrap();
/// assert_eq!(out["result"], 1);
/// # });
/// ```
pub struct LambdaStep<F> {
    name: String,
    latency: Duration,
    f: F,
}

impl<F, Fut> LambdaStep<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
{
    /// Create a new `LambdaStep` from the given closure.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            latency: Duration::ZERO,
            f,
        }
    }

    /// Declare a nominal latency for this step.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl<F, Fut> Step for LambdaStep<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn latency(&self) -> Duration {
        self.latency
    }

    async fn run(&self, ctx: &Context) -> Result<serde_json::Value> {
        (self.f)(ctx.clone()).await
    }
}

/// Extension trait providing [`StepExt::boxed`] for every [`Step`].
pub trait StepExt: Step + Sized {
    /// Erase the concrete step type, returning a trait object.
    fn boxed(self) -> BoxedStep
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<T: Step + Sized> StepExt for T {}
