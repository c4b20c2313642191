//! Per-invocation accumulation of outcomes, failures and trace events.
//!
//! Every chain strategy drives its steps through an [`Aggregator`]. It times
//! each run, classifies errors into [`Failure`]s, and at the end produces
//! either a [`ChainResult`] or an [`Error::Aborted`] carrying the partial
//! state.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::context::{output_key, Context};
use crate::error::ChainAbort;
use crate::events::{ChainEvent, TraceEntry};
use crate::outcome::{ChainMetadata, ChainResult, Failure, FailureKind, Outcome, Strategy};
use crate::step::Step;
use crate::Error;

/// Accumulates the state of one chain invocation.
///
/// An aggregator is created per call to `execute` and consumed by
/// [`Aggregator::finish`] or [`Aggregator::abort`], so no two invocations
/// ever share one.
#[derive(Debug)]
pub struct Aggregator {
    strategy: Strategy,
    started: Instant,
    outcomes: Vec<Outcome>,
    failures: Vec<Failure>,
    trace: Vec<TraceEntry>,
    step_time: Duration,
}

impl Aggregator {
    /// Start accumulating for an invocation of `strategy`.
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            started: Instant::now(),
            outcomes: Vec::new(),
            failures: Vec::new(),
            trace: Vec::new(),
            step_time: Duration::ZERO,
        }
    }

    /// Run `step` once against `ctx`.
    ///
    /// The run's elapsed time counts towards the invocation's step time
    /// whether or not it succeeds.
    ///
    /// A step returning [`Error::Validation`] yields a validation failure;
    /// any other error yields an execution failure. Nothing is recorded as
    /// an outcome until [`Aggregator::commit`] is called.
    pub async fn invoke(
        &mut self,
        step: &dyn Step,
        ctx: &Context,
        attempt: u32,
    ) -> Result<Outcome, Failure> {
        let name = step.name().to_string();
        debug!(step = %name, attempt, "step started");
        self.emit(ChainEvent::StepStart {
            step_name: name.clone(),
            attempt,
        });

        let start = Instant::now();
        let result = step.run(ctx).await;
        let elapsed = start.elapsed();
        self.step_time += elapsed;

        match result {
            Ok(payload) => {
                let elapsed_ms = elapsed.as_millis() as u64;
                debug!(step = %name, attempt, elapsed_ms, "step finished");
                self.emit(ChainEvent::StepEnd {
                    step_name: name.clone(),
                    attempt,
                    duration_ms: elapsed_ms,
                });
                Ok(Outcome {
                    step: name,
                    payload,
                    elapsed,
                    nominal_latency: step.latency(),
                    attempt,
                })
            }
            Err(e) => {
                let kind = match &e {
                    Error::Validation(_) => FailureKind::Validation,
                    _ => FailureKind::Execution,
                };
                Err(Failure::new(kind, name, attempt, e.detail()))
            }
        }
    }

    /// Accept `outcome`: write its payload into `ctx` under the step's output
    /// key and append it to the outcome list.
    pub fn commit(&mut self, ctx: &mut Context, outcome: Outcome) -> Result<(), Failure> {
        if let Err(e) = ctx.insert(output_key(&outcome.step), outcome.payload.clone()) {
            return Err(Failure::new(
                FailureKind::Execution,
                outcome.step,
                outcome.attempt,
                e.detail(),
            ));
        }
        self.outcomes.push(outcome);
        Ok(())
    }

    /// Record a failure that the chain recovers from.
    pub fn recover(&mut self, failure: Failure) {
        warn!(
            step = %failure.step,
            attempt = failure.attempt,
            detail = %failure.detail,
            "attempt rejected"
        );
        self.emit(ChainEvent::GateRejected {
            step_name: failure.step.clone(),
            attempt: failure.attempt,
            detail: failure.detail.clone(),
        });
        self.failures.push(failure);
    }

    /// Append an event to the invocation trace.
    pub fn emit(&mut self, event: ChainEvent) {
        self.trace.push(TraceEntry::new(event));
    }

    /// Terminate the invocation with a fatal `failure`.
    ///
    /// The failure is appended to the history, and the partial context,
    /// outcomes and history are handed back inside the error.
    #[must_use]
    pub fn abort(mut self, failure: Failure, context: Context) -> Error {
        warn!(
            strategy = ?self.strategy,
            step = %failure.step,
            attempt = failure.attempt,
            kind = %failure.kind,
            detail = %failure.detail,
            "chain aborted"
        );
        self.emit(ChainEvent::Error {
            step_name: failure.step.clone(),
            kind: failure.kind,
            message: failure.detail.clone(),
        });
        self.failures.push(failure.clone());
        ChainAbort {
            failure,
            context,
            outcomes: self.outcomes,
            failures: self.failures,
        }
        .into()
    }

    /// Produce the final result of a successful invocation.
    #[must_use]
    pub fn finish(self, context: Context, metadata: ChainMetadata) -> ChainResult {
        let elapsed = self.started.elapsed();
        debug!(
            strategy = ?self.strategy,
            steps = self.outcomes.len(),
            failures = self.failures.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "chain finished"
        );
        ChainResult {
            strategy: self.strategy,
            context,
            outcomes: self.outcomes,
            failures: self.failures,
            metadata,
            trace: self.trace,
            step_time: self.step_time,
            elapsed,
        }
    }
}
