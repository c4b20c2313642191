//! Two-stage produce-then-review with meta-validation.

use async_trait::async_trait;
use tracing::info;

use crate::aggregate::Aggregator;
use crate::config::{default_meta_questions, ChainPolicy, TASK_PLACEHOLDER};
use crate::context::{META_QUESTIONS_KEY, ORIGINAL_TASK_KEY};
use crate::events::ChainEvent;
use crate::gate::{self, NonEmptyField, ValidationGate};
use crate::outcome::{ChainMetadata, ChainResult, Failure, FailureKind, Strategy};
use crate::step::{BoxedStep, Step};
use crate::{Context, Result};
use super::{ensure_named, Chain};

/// Runs a producer, then a reviewer over the producer's output, and fails
/// unless the review passes meta-validation.
///
/// The reviewer's context holds the design payload as input, the original
/// task under `original_task`, and the meta-questions under
/// `meta_questions`. Any `{task}` placeholder in a question is replaced with
/// the task. A failed meta-validation is fatal; this strategy never retries.
///
/// The default gate requires a non-empty `"result"` field in the review.
///
/// # Example
///
/// ```rust
/// use agent_chain::{Chain, EchoStep, RecursiveMetaChain};
///
/// # tokio_test::block_on(async {
/// let chain =
///     RecursiveMetaChain::new(EchoStep::new("Designer"), EchoStep::new("Reviewer")).unwrap();
/// let result = chain.execute("a complex event").await.unwrap();
///
/// assert_eq!(result.meta_validation_passed(), Some(true));
/// let task = result.context.get("original_task").and_then(|v| v.as_text());
/// assert_eq!(task, Some("a complex event"));
/// # });
/// ```
pub struct RecursiveMetaChain {
    producer: BoxedStep,
    reviewer: BoxedStep,
    gate: Box<dyn ValidationGate>,
    meta_questions: Vec<String>,
}

impl RecursiveMetaChain {
    /// Create a chain with the default gate and meta-questions.
    pub fn new<P, R>(producer: P, reviewer: R) -> Result<Self>
    where
        P: Step + 'static,
        R: Step + 'static,
    {
        ensure_named(&producer)?;
        ensure_named(&reviewer)?;
        Ok(Self {
            producer: Box::new(producer),
            reviewer: Box::new(reviewer),
            gate: Box::new(NonEmptyField::default()),
            meta_questions: default_meta_questions(),
        })
    }

    /// Create a chain whose gate field and meta-questions come from `policy`.
    pub fn from_policy<P, R>(producer: P, reviewer: R, policy: &ChainPolicy) -> Result<Self>
    where
        P: Step + 'static,
        R: Step + 'static,
    {
        policy.validate()?;
        Ok(Self::new(producer, reviewer)?
            .with_gate(NonEmptyField::new(policy.result_field.clone()))
            .with_meta_questions(policy.meta_questions.clone()))
    }

    /// Replace the meta-validation gate.
    pub fn with_gate<G: ValidationGate + 'static>(mut self, gate: G) -> Self {
        self.gate = Box::new(gate);
        self
    }

    /// Replace the meta-questions handed to the reviewer.
    pub fn with_meta_questions(mut self, questions: Vec<String>) -> Self {
        self.meta_questions = questions;
        self
    }

    /// The meta-questions for `task`, placeholders filled in.
    pub fn questions_for(&self, task: &str) -> Vec<String> {
        self.meta_questions
            .iter()
            .map(|q| q.replace(TASK_PLACEHOLDER, task))
            .collect()
    }
}

#[async_trait]
impl Chain for RecursiveMetaChain {
    fn strategy(&self) -> Strategy {
        Strategy::RecursiveMeta
    }

    async fn execute(&self, input: &str) -> Result<ChainResult> {
        let mut agg = Aggregator::new(Strategy::RecursiveMeta);

        let mut design_ctx = Context::with_input(input);
        let design = match agg.invoke(self.producer.as_ref(), &design_ctx, 1).await {
            Ok(outcome) => outcome,
            Err(failure) => return Err(agg.abort(failure, design_ctx)),
        };
        let design_payload = design.payload.clone();
        if let Err(failure) = agg.commit(&mut design_ctx, design) {
            return Err(agg.abort(failure, design_ctx));
        }

        let mut review_ctx = Context::with_input(design_payload);
        review_ctx.set(ORIGINAL_TASK_KEY, input);
        review_ctx.set(META_QUESTIONS_KEY, self.questions_for(input));

        let review = match agg.invoke(self.reviewer.as_ref(), &review_ctx, 1).await {
            Ok(outcome) => outcome,
            Err(failure) => return Err(agg.abort(failure, review_ctx)),
        };
        let verdict = gate::apply(self.gate.as_ref(), &review.payload);
        if let Err(failure) = agg.commit(&mut review_ctx, review) {
            return Err(agg.abort(failure, review_ctx));
        }

        let passed = verdict.is_ok();
        info!(passed, reviewer = self.reviewer.name(), "meta-validation checked");
        agg.emit(ChainEvent::MetaValidated { passed });

        if let Err(detail) = verdict {
            let failure = Failure::new(
                FailureKind::MetaValidation,
                self.reviewer.name(),
                1,
                format!("meta-validation failed: {detail}"),
            );
            return Err(agg.abort(failure, review_ctx));
        }

        Ok(agg.finish(review_ctx, ChainMetadata::Meta { passed }))
    }
}
