//! The key-value accumulator threaded through a chain invocation.
//!
//! A [`Context`] is owned by exactly one in-flight invocation. Step outputs
//! are written once under `<step>_output` and never overwritten; the only
//! mutable slots are control keys such as [`RETRY_FEEDBACK_KEY`], and only the
//! chains themselves may rewrite them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Key under which every strategy seeds the caller's input.
pub const INPUT_KEY: &str = "user_input";
/// Key holding the decision issues handed to the reject branch.
pub const FEEDBACK_KEY: &str = "feedback";
/// Key holding the previous attempt's failure detail during retries.
pub const RETRY_FEEDBACK_KEY: &str = "retry_feedback";
/// Key holding the caller's task in a meta-review context.
pub const ORIGINAL_TASK_KEY: &str = "original_task";
/// Key holding the meta-questions in a meta-review context.
pub const META_QUESTIONS_KEY: &str = "meta_questions";

/// The context key a step's output is written under.
#[must_use]
pub fn output_key(step: &str) -> String {
    format!("{step}_output")
}

/// The shapes of value a context slot can hold.
///
/// Serialized adjacently tagged, so a payload that happens to be a string or
/// a list of strings keeps its variant across a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContextValue {
    /// Free text: the task, an input, or feedback.
    Text(String),
    /// A list of strings: issues or meta-questions.
    List(Vec<String>),
    /// A step's output payload.
    Payload(serde_json::Value),
}

impl ContextValue {
    /// Returns the text if this is a [`ContextValue::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContextValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list if this is a [`ContextValue::List`].
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ContextValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the payload if this is a [`ContextValue::Payload`].
    #[must_use]
    pub fn as_payload(&self) -> Option<&serde_json::Value> {
        match self {
            ContextValue::Payload(v) => Some(v),
            _ => None,
        }
    }

    /// Render this value as JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ContextValue::Text(s) => serde_json::Value::String(s.clone()),
            ContextValue::List(items) => serde_json::Value::from(items.clone()),
            ContextValue::Payload(v) => v.clone(),
        }
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Text(s)
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Text(s.to_string())
    }
}

impl From<Vec<String>> for ContextValue {
    fn from(items: Vec<String>) -> Self {
        ContextValue::List(items)
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(v: serde_json::Value) -> Self {
        ContextValue::Payload(v)
    }
}

/// An ordered mapping from string keys to [`ContextValue`]s.
///
/// Insertion order is preserved for diagnostics only.
///
/// # Example
///
/// ```rust
/// use agent_chain::{Context, Error};
///
/// let mut ctx = Context::with_input("draft an event");
/// ctx.insert("A_output", serde_json::json!({"result": "done"})).unwrap();
///
/// // Outputs are write-once.
/// let err = ctx.insert("A_output", "again").unwrap_err();
/// assert!(matches!(err, Error::ContextKeyOccupied(_)));
///
/// assert_eq!(ctx.input(), Some("draft an event"));
/// assert_eq!(ctx.keys().collect::<Vec<_>>(), ["user_input", "A_output"]);
/// ```
///
/// Overwriting is reserved for the chains' own control keys:
///
/// ```compile_fail
/// use agent_chain::Context;
///
/// let mut ctx = Context::new();
/// ctx.set("A_output", "forged");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    entries: IndexMap<String, ContextValue>,
}

impl Context {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context seeded with `input` under [`INPUT_KEY`].
    #[must_use]
    pub fn with_input(input: impl Into<ContextValue>) -> Self {
        let mut entries = IndexMap::new();
        entries.insert(INPUT_KEY.to_string(), input.into());
        Self { entries }
    }

    /// Write `value` under `key`, refusing to overwrite an existing entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Result<()> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(Error::ContextKeyOccupied(key));
        }
        self.entries.insert(key, value.into());
        Ok(())
    }

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// Reserved for control keys like [`RETRY_FEEDBACK_KEY`]; step outputs go
    /// through [`Context::insert`].
    pub(crate) fn set(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Remove a key, keeping the order of the remaining entries.
    pub(crate) fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.entries.shift_remove(key)
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The input text seeded under [`INPUT_KEY`], if it is text.
    #[must_use]
    pub fn input(&self) -> Option<&str> {
        self.get(INPUT_KEY).and_then(ContextValue::as_text)
    }

    /// The output payload written by `step`, if any.
    #[must_use]
    pub fn output(&self, step: &str) -> Option<&serde_json::Value> {
        self.get(&output_key(step)).and_then(ContextValue::as_payload)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the context has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_overwrites_control_keys() {
        let mut ctx = Context::with_input("task");
        ctx.set(RETRY_FEEDBACK_KEY, "first");
        ctx.set(RETRY_FEEDBACK_KEY, "second");
        assert_eq!(
            ctx.get(RETRY_FEEDBACK_KEY).and_then(ContextValue::as_text),
            Some("second")
        );

        assert!(ctx.remove(RETRY_FEEDBACK_KEY).is_some());
        assert!(!ctx.contains_key(RETRY_FEEDBACK_KEY));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_output_lookup() {
        let mut ctx = Context::new();
        assert!(ctx.is_empty());
        ctx.insert(output_key("Writer"), json!({"result": "ok"})).unwrap();
        assert_eq!(ctx.output("Writer"), Some(&json!({"result": "ok"})));
        assert_eq!(ctx.output("Reader"), None);
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let mut ctx = Context::with_input("x");
        ctx.insert(FEEDBACK_KEY, vec!["too short".to_string()]).unwrap();
        ctx.insert("A_output", json!({"agent": "A"})).unwrap();

        let json = serde_json::to_string(&ctx).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"user_input":{"kind":"text","value":"x"},"#,
                r#""feedback":{"kind":"list","value":["too short"]},"#,
                r#""A_output":{"kind":"payload","value":{"agent":"A"}}}"#,
            )
        );
    }

    #[test]
    fn test_string_payloads_survive_round_trip() {
        let mut ctx = Context::with_input("x");
        ctx.insert(output_key("A"), json!("plain text")).unwrap();
        ctx.insert(output_key("B"), json!(["a", "b"])).unwrap();

        let json = serde_json::to_string(&ctx).unwrap();
        let back: Context = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctx);
        assert_eq!(back.output("A"), Some(&json!("plain text")));
        assert_eq!(back.output("B"), Some(&json!(["a", "b"])));
        assert_eq!(back.input(), Some("x"));
    }
}
