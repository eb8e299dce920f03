//! Error types for dispatch and selection

use std::error::Error as StdError;

/// Boxed error carried by a failed action.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors produced while dispatching actions or waiting on them.
///
/// [`DispatchError::Cancelled`] is the cancellation signal. It unwinds an
/// action tree once its token is cancelled and is converted into silent
/// abandonment at the outermost [`Task`](crate::Task), so callers of
/// [`Dispatcher::dispatch`](crate::Dispatcher::dispatch) never observe it
/// for asynchronous actions.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The action tree's cancellation token was cancelled.
    #[error("dispatch cancelled")]
    Cancelled,

    /// The action body returned an error.
    #[error("action failed: {source}")]
    Failed {
        #[source]
        source: BoxError,
    },

    /// An asynchronous action panicked while running.
    #[error("action `{action}` panicked")]
    Panicked { action: &'static str },

    /// The registry was cleared before a matching action was dispatched.
    #[error("registry cleared before a matching action was dispatched")]
    Detached,

    /// An asynchronous action was dispatched outside a Tokio runtime.
    #[error("no Tokio runtime to run action `{action}`")]
    NoRuntime { action: &'static str },
}

impl DispatchError {
    /// Wrap any error as an action failure.
    ///
    /// ```
    /// use tidux_core::DispatchError;
    ///
    /// let err = "42x".parse::<i32>().map_err(DispatchError::failed).unwrap_err();
    /// assert!(!err.is_cancelled());
    /// ```
    pub fn failed(source: impl Into<BoxError>) -> Self {
        Self::Failed {
            source: source.into(),
        }
    }

    /// Create an action failure from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::failed(message.into())
    }

    /// Whether this is the cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors produced by a [`SelectorBinding`](crate::SelectorBinding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    /// The selector produced no value.
    #[error("invalid selector result: selector produced no value")]
    InvalidResult,
}
