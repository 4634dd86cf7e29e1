//! Error types for store mutation and component hooks.

use std::fmt;

/// Errors from [`ReactiveStore`](crate::reactive::ReactiveStore) mutation.
///
/// These are configuration errors: the store logs them as warnings and leaves
/// its value untouched. They are returned so callers can react if they care.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store root must be an object or an array, got {kind}")]
    InvalidRoot { kind: &'static str },
    #[error("no value at `{path}`")]
    MissingPath { path: String },
    #[error("value at `{path}` is not an object or an array")]
    NotAContainer { path: String },
    #[error("index {index} out of bounds at `{path}` (len {len})")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },
}

/// Failure raised by an author-supplied [`Component`](crate::element::Component) hook.
///
/// The runtime does not recover from it: the rest of the hook sequence for that
/// callback is skipped and the failure is reported in the
/// [`TickReport`](crate::runtime::TickReport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    /// Create a hook error with the given message.
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<StoreError> for HookError {
    fn from(err: StoreError) -> Self {
        Self::new(err)
    }
}

/// Result type returned by component hooks.
pub type HookResult = Result<(), HookError>;
