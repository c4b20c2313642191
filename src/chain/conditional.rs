//! Single-point conditional routing.

use async_trait::async_trait;
use tracing::info;

use crate::aggregate::Aggregator;
use crate::config::{validate_threshold, ChainPolicy, DEFAULT_ACCEPT_THRESHOLD};
use crate::context::FEEDBACK_KEY;
use crate::events::ChainEvent;
use crate::gate::DecisionPredicate;
use crate::outcome::{Branch, ChainMetadata, ChainResult, Failure, FailureKind, Strategy};
use crate::step::{BoxedStep, Step};
use crate::{Context, Result};
use super::{ensure_named, Chain};

/// Drafts, scores the draft, then runs exactly one continuation.
///
/// A draft scoring at or above the threshold (default `0.8`) goes to the
/// accept step, whose context carries the draft payload as input. Anything
/// lower goes to the reject step, which starts over from the original task
/// with the verdict's issues under `feedback`; it never sees the draft.
///
/// # Example
///
/// ```rust
/// use agent_chain::{Branch, Chain, ConditionalChain, EchoStep, Verdict};
/// use agent_chain::gate::DecisionFn;
///
/// # tokio_test::block_on(async {
/// let chain = ConditionalChain::new(
///     EchoStep::new("Drafter"),
///     DecisionFn::new(|_: &serde_json::Value| Ok(Verdict::new(0.5, vec!["too vague".into()]))),
///     EchoStep::new("Polisher"),
///     EchoStep::new("Rewriter"),
/// ).unwrap();
///
/// let result = chain.execute("write an event").await.unwrap();
/// assert_eq!(result.branch_taken(), Some(Branch::Reject));
/// assert_eq!(result.last_outcome().unwrap().step, "Rewriter");
/// # });
/// ```
pub struct ConditionalChain {
    initial: BoxedStep,
    decision: Box<dyn DecisionPredicate>,
    accept: BoxedStep,
    reject: BoxedStep,
    threshold: f64,
}

impl ConditionalChain {
    /// Create a conditional chain with the default acceptance threshold.
    pub fn new<I, D, A, R>(initial: I, decision: D, accept: A, reject: R) -> Result<Self>
    where
        I: Step + 'static,
        D: DecisionPredicate + 'static,
        A: Step + 'static,
        R: Step + 'static,
    {
        ensure_named(&initial)?;
        ensure_named(&accept)?;
        ensure_named(&reject)?;
        Ok(Self {
            initial: Box::new(initial),
            decision: Box::new(decision),
            accept: Box::new(accept),
            reject: Box::new(reject),
            threshold: DEFAULT_ACCEPT_THRESHOLD,
        })
    }

    /// Create a conditional chain using the policy's threshold.
    pub fn from_policy<I, D, A, R>(
        initial: I,
        decision: D,
        accept: A,
        reject: R,
        policy: &ChainPolicy,
    ) -> Result<Self>
    where
        I: Step + 'static,
        D: DecisionPredicate + 'static,
        A: Step + 'static,
        R: Step + 'static,
    {
        Self::new(initial, decision, accept, reject)?.with_threshold(policy.acceptance_threshold)
    }

    /// Override the acceptance threshold. Must be a finite value in `[0, 1]`.
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        self.threshold = threshold;
        Ok(self)
    }

    /// The acceptance threshold in effect.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[async_trait]
impl Chain for ConditionalChain {
    fn strategy(&self) -> Strategy {
        Strategy::Conditional
    }

    async fn execute(&self, input: &str) -> Result<ChainResult> {
        let mut agg = Aggregator::new(Strategy::Conditional);

        let mut draft_ctx = Context::with_input(input);
        let draft = match agg.invoke(self.initial.as_ref(), &draft_ctx, 1).await {
            Ok(outcome) => outcome,
            Err(failure) => return Err(agg.abort(failure, draft_ctx)),
        };
        let draft_payload = draft.payload.clone();
        if let Err(failure) = agg.commit(&mut draft_ctx, draft) {
            return Err(agg.abort(failure, draft_ctx));
        }

        let verdict = match self
            .decision
            .evaluate(&draft_payload)
            .and_then(|v| v.ensure_in_range().map(|()| v))
        {
            Ok(verdict) => verdict,
            Err(e) => {
                let failure =
                    Failure::new(FailureKind::Execution, self.initial.name(), 1, e.detail());
                return Err(agg.abort(failure, draft_ctx));
            }
        };

        let (branch, step, mut ctx) = if verdict.score >= self.threshold {
            (Branch::Accept, &self.accept, Context::with_input(draft_payload))
        } else {
            let mut ctx = Context::with_input(input);
            ctx.set(FEEDBACK_KEY, verdict.issues.clone());
            (Branch::Reject, &self.reject, ctx)
        };

        info!(
            branch = %branch,
            score = verdict.score,
            threshold = self.threshold,
            issues = verdict.issues.len(),
            "branch selected"
        );
        agg.emit(ChainEvent::BranchSelected {
            branch,
            score: verdict.score,
        });

        let outcome = match agg.invoke(step.as_ref(), &ctx, 1).await {
            Ok(outcome) => outcome,
            Err(failure) => return Err(agg.abort(failure, ctx)),
        };
        if let Err(failure) = agg.commit(&mut ctx, outcome) {
            return Err(agg.abort(failure, ctx));
        }

        Ok(agg.finish(
            ctx,
            ChainMetadata::Branch {
                taken: branch,
                verdict,
            },
        ))
    }
}
