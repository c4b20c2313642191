//! A stand-in agent that reports what it was given.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::context::{ContextValue, INPUT_KEY};
use crate::{Context, Result};
use super::Step;

/// A step that waits for its nominal latency and echoes its input.
///
/// The payload is `{agent, processed_input, result}` where `result` reads
/// `"<name> processed the input"`.
///
/// # Example
///
/// ```rust
/// use agent_chain::{Context, EchoStep, Step};
///
/// # tokio_test::block_on(async {
/// let out = EchoStep::new("Writer").run(&Context::with_input("x")).await.unwrap();
/// assert_eq!(out["agent"], "Writer");
/// assert_eq!(out["processed_input"], "x");
/// assert_eq!(out["result"], "Writer processed the input");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct EchoStep {
    name: String,
    latency: Duration,
}

impl EchoStep {
    /// Create an echo step with no latency.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latency: Duration::ZERO,
        }
    }

    /// Sleep for `latency` on every run.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl Step for EchoStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn latency(&self) -> Duration {
        self.latency
    }

    async fn run(&self, ctx: &Context) -> Result<serde_json::Value> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let processed_input = ctx
            .get(INPUT_KEY)
            .map(ContextValue::to_json)
            .unwrap_or_else(|| json!(""));

        Ok(json!({
            "agent": self.name,
            "processed_input": processed_input,
            "result": format!("{} processed the input", self.name),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echoes_payload_input() {
        let ctx = Context::with_input(json!({"draft": true}));
        let out = EchoStep::new("Improver").run(&ctx).await.unwrap();
        assert_eq!(out["processed_input"], json!({"draft": true}));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let out = EchoStep::new("A").run(&Context::new()).await.unwrap();
        assert_eq!(out["processed_input"], "");
    }

    #[tokio::test]
    async fn test_sleeps_for_latency() {
        let step = EchoStep::new("Slow").with_latency(Duration::from_millis(20));
        let start = std::time::Instant::now();
        step.run(&Context::new()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(step.latency(), Duration::from_millis(20));
    }
}
