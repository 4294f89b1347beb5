//! Task errors

use thiserror::Error;

use super::task::TaskId;

/// Result of a task body.
pub type AsyncResult<T> = Result<T, AsyncError>;

/// Errors surfaced through a task's error channel.
///
/// A continuation chained from a failed task does not run its body; it
/// completes with the same error, so the failure reaches every `wait()`
/// further down the chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AsyncError {
    #[error("{task} panicked: {message}")]
    Panicked {
        /// The task whose body panicked
        task: TaskId,
        /// The panic payload, when it was a string
        message: String,
    },

    #[error("{task} failed: {message}")]
    Failed {
        /// The task whose body returned an error
        task: TaskId,
        /// The error chain, rendered with `{:#}`
        message: String,
    },
}

impl AsyncError {
    /// The task that originally raised the error.
    pub fn task(&self) -> TaskId {
        match self {
            AsyncError::Panicked { task, .. } | AsyncError::Failed { task, .. } => *task,
        }
    }

    /// Build a `Panicked` error from a `catch_unwind` payload.
    pub(crate) fn from_panic(
        task: TaskId,
        payload: Box<dyn std::any::Any + Send>,
    ) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        AsyncError::Panicked { task, message }
    }

    /// Build a `Failed` error from an `anyhow` error.
    pub(crate) fn from_anyhow(
        task: TaskId,
        error: anyhow::Error,
    ) -> Self {
        AsyncError::Failed {
            task,
            message: format!("{:#}", error),
        }
    }
}
