//! Error types for chain construction and execution.

use std::fmt;

use thiserror::Error;

use crate::context::Context;
use crate::outcome::{Failure, Outcome};

/// The main error type for chain operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A chain or policy was constructed with invalid parameters.
    ///
    /// Only ever produced at construction time, never while executing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An error occurred during execution.
    #[error("Execution error: {0}")]
    Execution(String),

    /// A context key was written twice.
    #[error("Context key '{0}' is already set")]
    ContextKeyOccupied(String),

    /// A chain invocation terminated with a fatal failure.
    #[error("{0}")]
    Aborted(Box<ChainAbort>),

    /// A JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A generic error with a message.
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// The bare message carried by this error, without the variant prefix.
    ///
    /// This is what ends up in [`Failure::detail`].
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Error::Configuration(msg)
            | Error::Validation(msg)
            | Error::Execution(msg)
            | Error::Message(msg) => msg.clone(),
            Error::Aborted(abort) => abort.failure.detail.clone(),
            other => other.to_string(),
        }
    }

    /// Returns the abort record if this error terminated a chain.
    #[must_use]
    pub fn as_abort(&self) -> Option<&ChainAbort> {
        match self {
            Error::Aborted(abort) => Some(abort),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Message(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Message(msg.to_string())
    }
}

impl From<ChainAbort> for Error {
    fn from(abort: ChainAbort) -> Self {
        Error::Aborted(Box::new(abort))
    }
}

/// Diagnostics carried by a fatal chain failure.
///
/// Holds everything the invocation had accumulated when it stopped, so the
/// caller can inspect how far it got.
#[derive(Debug, Clone)]
pub struct ChainAbort {
    /// The failure that terminated the chain.
    pub failure: Failure,
    /// The context as it stood when the chain stopped.
    pub context: Context,
    /// Outcomes produced before the failure, in execution order.
    pub outcomes: Vec<Outcome>,
    /// Every failure recorded during the invocation, including the fatal one.
    pub failures: Vec<Failure>,
}

impl fmt::Display for ChainAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chain aborted at step '{}' (attempt {}): {} failure: {}",
            self.failure.step, self.failure.attempt, self.failure.kind, self.failure.detail
        )
    }
}

/// A specialized `Result` type for chain operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::FailureKind;

    #[test]
    fn test_detail_strips_prefix() {
        let err = Error::Validation("bad".to_string());
        assert_eq!(err.to_string(), "Validation error: bad");
        assert_eq!(err.detail(), "bad");

        let err = Error::ContextKeyOccupied("A_output".to_string());
        assert_eq!(err.detail(), "Context key 'A_output' is already set");
    }

    #[test]
    fn test_abort_display() {
        let failure = Failure::new(FailureKind::Validation, "A", 3, "bad");
        let err: Error = ChainAbort {
            failure: failure.clone(),
            context: Context::new(),
            outcomes: Vec::new(),
            failures: vec![failure],
        }
        .into();

        assert_eq!(
            err.to_string(),
            "chain aborted at step 'A' (attempt 3): validation failure: bad"
        );
        assert_eq!(err.detail(), "bad");
        assert_eq!(err.as_abort().map(|a| a.failures.len()), Some(1));
    }
}
