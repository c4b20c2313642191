//! Validation gates and decision predicates.
//!
//! These are the opaque checks a caller plugs into a chain. Each is a
//! single-method trait so tests can substitute deterministic fakes; closure
//! adapters ([`GateFn`], [`DecisionFn`]) cover the quick cases.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Default payload field inspected by [`NonEmptyField`].
pub const DEFAULT_RESULT_FIELD: &str = "result";

/// A pass/fail check over a step's output payload.
///
/// Returning `Ok(false)` fails with [`ValidationGate::rejection`] as detail;
/// returning an error fails with that error's [`Error::detail`].
pub trait ValidationGate: Send + Sync {
    /// Check `payload`.
    fn check(&self, payload: &Value) -> Result<bool>;

    /// Detail recorded when [`ValidationGate::check`] returns `Ok(false)`.
    fn rejection(&self) -> String {
        "output rejected by validation gate".to_string()
    }
}

/// Passes iff `payload[field]` is present and non-empty.
///
/// Strings must be non-empty, arrays and objects must have entries, `null`
/// never passes, and any other value passes.
///
/// # Example
///
/// ```rust
/// use agent_chain::gate::{NonEmptyField, ValidationGate};
/// use serde_json::json;
///
/// let gate = NonEmptyField::default();
/// assert!(gate.check(&json!({"result": "looks fine"})).unwrap());
/// assert!(!gate.check(&json!({"result": ""})).unwrap());
/// assert!(!gate.check(&json!({"other": "x"})).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct NonEmptyField {
    field: String,
}

impl NonEmptyField {
    /// Check the given field instead of `"result"`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// The field this gate inspects.
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Default for NonEmptyField {
    fn default() -> Self {
        Self::new(DEFAULT_RESULT_FIELD)
    }
}

impl ValidationGate for NonEmptyField {
    fn check(&self, payload: &Value) -> Result<bool> {
        Ok(match payload.get(&self.field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        })
    }

    fn rejection(&self) -> String {
        format!("field '{}' is missing or empty", self.field)
    }
}

/// Passes iff the string at `payload[field]` contains `needle`.
///
/// ```rust
/// use agent_chain::gate::{FieldContains, ValidationGate};
/// use serde_json::json;
///
/// let gate = FieldContains::new("result", "processed");
/// assert!(gate.check(&json!({"result": "A processed the input"})).unwrap());
/// assert_eq!(gate.rejection(), "Invalid output format");
/// ```
#[derive(Debug, Clone)]
pub struct FieldContains {
    field: String,
    needle: String,
    message: String,
}

impl FieldContains {
    pub fn new(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            needle: needle.into(),
            message: "Invalid output format".to_string(),
        }
    }

    /// Replace the rejection message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl ValidationGate for FieldContains {
    fn check(&self, payload: &Value) -> Result<bool> {
        Ok(payload
            .get(&self.field)
            .and_then(Value::as_str)
            .is_some_and(|s| s.contains(&self.needle)))
    }

    fn rejection(&self) -> String {
        self.message.clone()
    }
}

/// A gate that accepts every payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ValidationGate for AcceptAll {
    fn check(&self, _payload: &Value) -> Result<bool> {
        Ok(true)
    }
}

/// A gate constructed from a closure.
///
/// ```rust
/// use agent_chain::gate::{GateFn, ValidationGate};
/// use agent_chain::Error;
/// use serde_json::json;
///
/// let gate = GateFn::new(|payload: &serde_json::Value| {
///     if payload["score"].as_u64().unwrap_or(0) < 10 {
///         return Err(Error::Validation("score too low".into()));
///     }
///     Ok(true)
/// });
/// assert!(gate.check(&json!({"score": 3})).is_err());
/// ```
pub struct GateFn<F> {
    f: F,
}

impl<F> GateFn<F>
where
    F: Fn(&Value) -> Result<bool> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ValidationGate for GateFn<F>
where
    F: Fn(&Value) -> Result<bool> + Send + Sync,
{
    fn check(&self, payload: &Value) -> Result<bool> {
        (self.f)(payload)
    }
}

/// Run `gate` over `payload`, collapsing both rejection forms into a detail
/// string.
pub(crate) fn apply(gate: &dyn ValidationGate, payload: &Value) -> std::result::Result<(), String> {
    match gate.check(payload) {
        Ok(true) => Ok(()),
        Ok(false) => Err(gate.rejection()),
        Err(e) => Err(e.detail()),
    }
}

/// A structured decision over a draft payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Quality score in `[0, 1]`.
    pub score: f64,
    /// Issues found; handed to the reject branch as feedback.
    pub issues: Vec<String>,
}

impl Verdict {
    pub fn new(score: f64, issues: Vec<String>) -> Self {
        Self { score, issues }
    }

    /// A verdict with no issues.
    pub fn score(score: f64) -> Self {
        Self::new(score, Vec::new())
    }

    /// Fails unless the score is a finite number in `[0, 1]`.
    pub fn ensure_in_range(&self) -> Result<()> {
        if self.score.is_finite() && (0.0..=1.0).contains(&self.score) {
            Ok(())
        } else {
            Err(Error::Execution(format!(
                "decision score {} is outside [0, 1]",
                self.score
            )))
        }
    }
}

/// Scores a draft payload for a conditional chain.
pub trait DecisionPredicate: Send + Sync {
    fn evaluate(&self, payload: &Value) -> Result<Verdict>;
}

/// A decision predicate constructed from a closure.
pub struct DecisionFn<F> {
    f: F,
}

impl<F> DecisionFn<F>
where
    F: Fn(&Value) -> Result<Verdict> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> DecisionPredicate for DecisionFn<F>
where
    F: Fn(&Value) -> Result<Verdict> + Send + Sync,
{
    fn evaluate(&self, payload: &Value) -> Result<Verdict> {
        (self.f)(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_empty_field_shapes() {
        let gate = NonEmptyField::new("items");
        assert!(gate.check(&json!({"items": [1]})).unwrap());
        assert!(!gate.check(&json!({"items": []})).unwrap());
        assert!(!gate.check(&json!({"items": null})).unwrap());
        assert!(gate.check(&json!({"items": 0})).unwrap());
        assert!(!gate.check(&json!("not an object")).unwrap());
        assert_eq!(gate.rejection(), "field 'items' is missing or empty");
    }

    #[test]
    fn test_apply_uses_error_detail() {
        let gate = GateFn::new(|_: &Value| Err(Error::Validation("bad".into())));
        assert_eq!(apply(&gate, &json!({})), Err("bad".to_string()));

        assert_eq!(apply(&AcceptAll, &json!(null)), Ok(()));

        let gate = FieldContains::new("result", "processed").with_message("nope");
        assert_eq!(apply(&gate, &json!({"result": "idle"})), Err("nope".to_string()));
    }

    #[test]
    fn test_verdict_range() {
        assert!(Verdict::score(0.0).ensure_in_range().is_ok());
        assert!(Verdict::score(1.0).ensure_in_range().is_ok());
        assert!(Verdict::score(1.5).ensure_in_range().is_err());
        assert!(Verdict::score(f64::NAN).ensure_in_range().is_err());
    }
}
