//! Per-instance policy for chain construction.
//!
//! A [`ChainPolicy`] collects the knobs the strategies expose: acceptance
//! threshold, retry budget, the payload field gates inspect, and the
//! meta-questions. Every field has a default, so a policy can be loaded from
//! partial JSON.
//!
//! ```rust
//! use agent_chain::ChainPolicy;
//!
//! let policy = ChainPolicy::from_json(r#"{"max_attempts": 5}"#).unwrap();
//! assert_eq!(policy.max_attempts, 5);
//! assert_eq!(policy.acceptance_threshold, 0.8);
//!
//! assert!(ChainPolicy::from_json(r#"{"max_attempts": 0}"#).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::gate::DEFAULT_RESULT_FIELD;
use crate::{Error, Result};

/// Score at or above which a conditional chain takes the accept branch.
pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 0.8;

/// Attempts each step gets in a retrying chain.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Placeholder replaced with the caller's task in meta-questions.
pub const TASK_PLACEHOLDER: &str = "{task}";

/// The self-consistency checks a reviewer is asked by default.
pub fn default_meta_questions() -> Vec<String> {
    vec![
        format!("Does this result satisfy the original request '{TASK_PLACEHOLDER}'?"),
        "Is the design intent communicated clearly?".to_string(),
        "Was the core intent preserved through the refinement?".to_string(),
    ]
}

/// Construction-time policy shared by the chain strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainPolicy {
    /// Conditional chains accept drafts scoring at or above this.
    pub acceptance_threshold: f64,
    /// Attempts per step in a retrying chain.
    pub max_attempts: u32,
    /// Payload field inspected by the default gates.
    pub result_field: String,
    /// Questions handed to the reviewer of a recursive meta chain.
    pub meta_questions: Vec<String>,
}

impl Default for ChainPolicy {
    fn default() -> Self {
        Self {
            acceptance_threshold: DEFAULT_ACCEPT_THRESHOLD,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            result_field: DEFAULT_RESULT_FIELD.to_string(),
            meta_questions: default_meta_questions(),
        }
    }
}

impl ChainPolicy {
    /// Parse and validate a policy from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Check every field is usable.
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.acceptance_threshold)?;
        validate_max_attempts(self.max_attempts)?;
        if self.result_field.is_empty() {
            return Err(Error::Configuration("result_field must not be empty".into()));
        }
        Ok(())
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "acceptance threshold {threshold} is outside [0, 1]"
        )))
    }
}

pub(crate) fn validate_max_attempts(max_attempts: u32) -> Result<()> {
    if max_attempts == 0 {
        return Err(Error::Configuration("max_attempts must be at least 1".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = ChainPolicy::from_json("{}").unwrap();
        assert_eq!(policy, ChainPolicy::default());
        assert_eq!(policy.meta_questions.len(), 3);
        assert!(policy.meta_questions[0].contains(TASK_PLACEHOLDER));
    }

    #[test]
    fn test_rejects_bad_values() {
        for json in [
            r#"{"acceptance_threshold": 1.2}"#,
            r#"{"acceptance_threshold": -0.1}"#,
            r#"{"max_attempts": 0}"#,
            r#"{"result_field": ""}"#,
        ] {
            let err = ChainPolicy::from_json(json).unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "{json}: {err}");
        }
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = ChainPolicy::from_json(r#"{"retries": 2}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
