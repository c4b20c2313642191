//! Sequential composition with per-step validation and bounded retries.

use async_trait::async_trait;
use tracing::debug;

use crate::aggregate::Aggregator;
use crate::config::{validate_max_attempts, ChainPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::context::RETRY_FEEDBACK_KEY;
use crate::gate::{self, NonEmptyField, ValidationGate};
use crate::outcome::{ChainMetadata, ChainResult, Failure, FailureKind, Strategy};
use crate::step::BoxedStep;
use crate::{Context, Result};
use super::{ensure_steps, Chain};

/// Runs steps in order, giving each up to `max_attempts` tries to pass a
/// validation gate.
///
/// A rejected attempt is recorded in the failure history and its detail is
/// put under `retry_feedback` for the next attempt. The budget is per step:
/// every step starts with a fresh `max_attempts`. Exhausting it aborts the
/// whole chain. Execution failures are never retried.
///
/// The default gate requires a non-empty `"result"` field.
///
/// # Example
///
/// ```rust
/// use agent_chain::{Chain, EchoStep, RetryingChain, StepExt};
/// use agent_chain::gate::FieldContains;
///
/// # tokio_test::block_on(async {
/// let chain = RetryingChain::new(vec![EchoStep::new("Agent1").boxed()], 3)
///     .unwrap()
///     .with_gate(FieldContains::new("result", "processed"));
///
/// let result = chain.execute("task").await.unwrap();
/// assert!(result.failures.is_empty());
/// assert!(result.context.contains_key("Agent1_output"));
/// # });
/// ```
pub struct RetryingChain {
    steps: Vec<BoxedStep>,
    max_attempts: u32,
    gate: Box<dyn ValidationGate>,
}

impl RetryingChain {
    /// Create a chain over `steps` allowing `max_attempts` per step.
    ///
    /// Fails if `steps` is empty, names collide, or `max_attempts` is zero.
    pub fn new(steps: Vec<BoxedStep>, max_attempts: u32) -> Result<Self> {
        ensure_steps(&steps)?;
        validate_max_attempts(max_attempts)?;
        Ok(Self {
            steps,
            max_attempts,
            gate: Box::new(NonEmptyField::default()),
        })
    }

    /// Create a chain with the default budget of three attempts.
    pub fn with_default_budget(steps: Vec<BoxedStep>) -> Result<Self> {
        Self::new(steps, DEFAULT_MAX_ATTEMPTS)
    }

    /// Create a chain whose budget and default gate come from `policy`.
    pub fn from_policy(steps: Vec<BoxedStep>, policy: &ChainPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self::new(steps, policy.max_attempts)?
            .with_gate(NonEmptyField::new(policy.result_field.clone())))
    }

    /// Replace the validation gate.
    pub fn with_gate<G: ValidationGate + 'static>(mut self, gate: G) -> Self {
        self.gate = Box::new(gate);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

#[async_trait]
impl Chain for RetryingChain {
    fn strategy(&self) -> Strategy {
        Strategy::Retrying
    }

    async fn execute(&self, input: &str) -> Result<ChainResult> {
        let mut agg = Aggregator::new(Strategy::Retrying);
        let mut ctx = Context::with_input(input);

        for step in &self.steps {
            let mut attempt = 1;
            loop {
                let failure = match agg.invoke(step.as_ref(), &ctx, attempt).await {
                    Ok(outcome) => match gate::apply(self.gate.as_ref(), &outcome.payload) {
                        Ok(()) => {
                            ctx.remove(RETRY_FEEDBACK_KEY);
                            if let Err(failure) = agg.commit(&mut ctx, outcome) {
                                return Err(agg.abort(failure, ctx));
                            }
                            break;
                        }
                        Err(detail) => {
                            Failure::new(FailureKind::Validation, step.name(), attempt, detail)
                        }
                    },
                    Err(failure) if failure.kind.is_validation() => failure,
                    Err(failure) => return Err(agg.abort(failure, ctx)),
                };

                if attempt >= self.max_attempts {
                    return Err(agg.abort(failure, ctx));
                }

                debug!(step = step.name(), attempt, "retrying with feedback");
                ctx.set(RETRY_FEEDBACK_KEY, failure.detail.clone());
                agg.recover(failure);
                attempt += 1;
            }
        }

        Ok(agg.finish(ctx, ChainMetadata::None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextValue;
    use crate::gate::{AcceptAll, GateFn};
    use crate::{EchoStep, Error, LambdaStep, StepExt};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// A gate that rejects its first `k` checks with `"bad"`.
    fn fail_first(k: u32) -> impl ValidationGate {
        let calls = AtomicU32::new(0);
        GateFn::new(move |_: &Value| {
            if calls.fetch_add(1, Ordering::SeqCst) < k {
                Err(Error::Validation("bad".into()))
            } else {
                Ok(true)
            }
        })
    }

    /// A step whose payload records its attempt number and the feedback it saw.
    fn counting(name: &'static str, feedback: Arc<Mutex<Vec<Option<String>>>>) -> BoxedStep {
        let runs = Arc::new(AtomicU32::new(0));
        LambdaStep::new(name, move |ctx: Context| {
            let runs = Arc::clone(&runs);
            let feedback = Arc::clone(&feedback);
            async move {
                let run = runs.fetch_add(1, Ordering::SeqCst) + 1;
                let seen = ctx
                    .get(RETRY_FEEDBACK_KEY)
                    .and_then(ContextValue::as_text)
                    .map(str::to_string);
                feedback.lock().unwrap().push(seen);
                Ok::<_, Error>(json!({"result": format!("run {run}")}))
            }
        })
        .boxed()
    }

    #[tokio::test]
    async fn test_recovers_after_k_failures() {
        let feedback = Arc::new(Mutex::new(Vec::new()));
        let chain = RetryingChain::new(vec![counting("A", Arc::clone(&feedback))], 3)
            .unwrap()
            .with_gate(fail_first(2));

        let result = chain.execute("x").await.unwrap();
        assert_eq!(
            result.failures,
            vec![
                Failure::new(FailureKind::Validation, "A", 1, "bad"),
                Failure::new(FailureKind::Validation, "A", 2, "bad"),
            ]
        );
        let outcome = result.outcome("A").unwrap();
        assert_eq!(outcome.attempt, 3);
        assert_eq!(outcome.payload["result"], "run 3");
        assert_eq!(result.outcomes.len(), 1);

        let seen = feedback.lock().unwrap();
        assert_eq!(*seen, vec![None, Some("bad".to_string()), Some("bad".to_string())]);
        assert!(!result.context.contains_key(RETRY_FEEDBACK_KEY));
    }

    #[tokio::test]
    async fn test_exhaustion_aborts_after_n_attempts() {
        let feedback = Arc::new(Mutex::new(Vec::new()));
        let chain = RetryingChain::new(
            vec![
                counting("A", Arc::clone(&feedback)),
                EchoStep::new("B").boxed(),
            ],
            4,
        )
        .unwrap()
        .with_gate(GateFn::new(|_: &Value| Ok(false)));

        let err = chain.execute("x").await.unwrap_err();
        let abort = err.as_abort().unwrap();
        assert_eq!(feedback.lock().unwrap().len(), 4);
        assert_eq!(abort.failures.len(), 4);
        assert!(abort.failures.iter().all(|f| f.step == "A"));
        assert_eq!(
            abort.failures.iter().map(|f| f.attempt).collect::<Vec<_>>(),
            [1, 2, 3, 4]
        );
        assert_eq!(abort.failure.attempt, 4);
        assert_eq!(abort.failure.detail, "output rejected by validation gate");
        assert!(abort.outcomes.is_empty());
        assert!(!abort.context.contains_key("B_output"));
    }

    #[tokio::test]
    async fn test_budget_is_per_step() {
        // Each step fails twice before passing; a shared budget of 3 would
        // run out on the second step.
        let per_step = Arc::new(Mutex::new(0u32));
        let gate = {
            let per_step = Arc::clone(&per_step);
            GateFn::new(move |payload: &Value| {
                let mut n = per_step.lock().unwrap();
                *n += 1;
                if payload["result"] == "A processed the input" && *n <= 2 {
                    return Ok(false);
                }
                if payload["result"] == "B processed the input" && *n <= 5 {
                    return Ok(false);
                }
                Ok(true)
            })
        };
        let chain =
            RetryingChain::new(vec![EchoStep::new("A").boxed(), EchoStep::new("B").boxed()], 3)
                .unwrap()
                .with_gate(gate);

        let result = chain.execute("x").await.unwrap();
        assert_eq!(result.failures_for("A").count(), 2);
        assert_eq!(result.failures_for("B").count(), 2);
        assert_eq!(result.outcome("B").unwrap().attempt, 3);
    }

    #[tokio::test]
    async fn test_execution_failure_is_not_retried() {
        let runs = Arc::new(AtomicU32::new(0));
        let broken = {
            let runs = Arc::clone(&runs);
            LambdaStep::new("Broken", move |_ctx: Context| {
                runs.fetch_add(1, Ordering::SeqCst);
                async move { Err::<Value, _>(Error::Execution("connection reset".into())) }
            })
        };
        let chain = RetryingChain::new(vec![broken.boxed()], 3)
            .unwrap()
            .with_gate(AcceptAll);

        let err = chain.execute("x").await.unwrap_err();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        let abort = err.as_abort().unwrap();
        assert_eq!(abort.failure.kind, FailureKind::Execution);
        assert_eq!(abort.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_step_validation_error_consumes_budget() {
        let runs = Arc::new(AtomicU32::new(0));
        let flaky = {
            let runs = Arc::clone(&runs);
            LambdaStep::new("Flaky", move |_ctx: Context| {
                let run = runs.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if run == 1 {
                        Err(Error::Validation("missing title".into()))
                    } else {
                        Ok(json!({"result": "ok"}))
                    }
                }
            })
        };
        let chain = RetryingChain::with_default_budget(vec![flaky.boxed()]).unwrap();

        let result = chain.execute("x").await.unwrap();
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].detail, "missing title");
        assert_eq!(result.outcome("Flaky").unwrap().attempt, 2);
    }

    #[test]
    fn test_construction() {
        let steps = || vec![EchoStep::new("A").boxed()];
        assert!(matches!(
            RetryingChain::new(steps(), 0),
            Err(Error::Configuration(_))
        ));
        assert!(RetryingChain::new(Vec::new(), 3).is_err());
        assert_eq!(RetryingChain::with_default_budget(steps()).unwrap().max_attempts(), 3);

        let policy = ChainPolicy {
            max_attempts: 5,
            ..ChainPolicy::default()
        };
        assert_eq!(RetryingChain::from_policy(steps(), &policy).unwrap().max_attempts(), 5);
    }
}
