//! Cancellable handles for asynchronous dispatch
//!
//! [`Task`] is returned by an outermost dispatch and is the boundary where the
//! cancellation signal is absorbed: it resolves to `Ok(None)` instead of an
//! error. [`Subtask`] is returned by nested dispatch through a
//! [`DispatchContext`](crate::DispatchContext) and lets the signal propagate
//! with `?` so the enclosing action unwinds.
//!
//! Dropping either handle detaches it; the action keeps running and still
//! broadcasts on success.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::{JoinError, JoinHandle};

use crate::action::ActionRef;
use crate::cancel::CancelToken;
use crate::error::DispatchError;

type Handle<R> = JoinHandle<Result<R, DispatchError>>;

fn join_failure(action: ActionRef, err: JoinError) -> DispatchError {
    if err.is_panic() {
        DispatchError::Panicked {
            action: action.name(),
        }
    } else {
        DispatchError::Cancelled
    }
}

/// Root handle of an asynchronous dispatch.
///
/// Awaiting yields:
/// - `Ok(Some(result))` once the action completed and was broadcast
/// - `Ok(None)` if the action tree was cancelled and abandoned
/// - `Err(err)` if the action failed, or never started because no Tokio
///   runtime was available
#[must_use = "dropping a task detaches it; the action keeps running"]
pub struct Task<R> {
    handle: Option<Handle<R>>,
    token: CancelToken,
    action: ActionRef,
}

impl<R> Task<R> {
    pub(crate) fn new(handle: Handle<R>, token: CancelToken, action: ActionRef) -> Self {
        Self {
            handle: Some(handle),
            token,
            action,
        }
    }

    /// A task that never started; awaiting it yields [`DispatchError::NoRuntime`].
    pub(crate) fn unstarted(token: CancelToken, action: ActionRef) -> Self {
        Self {
            handle: None,
            token,
            action,
        }
    }

    /// Cancel the action tree.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the action tree has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The cancellation token shared with every nested dispatch.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// The dispatched action.
    pub fn action(&self) -> ActionRef {
        self.action
    }

    /// Whether the action has settled.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl<R> Future for Task<R> {
    type Output = Result<Option<R>, DispatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(handle) = this.handle.as_mut() else {
            return Poll::Ready(Err(DispatchError::NoRuntime {
                action: this.action.name(),
            }));
        };
        let joined = match Pin::new(handle).poll(cx) {
            Poll::Ready(joined) => joined,
            Poll::Pending => return Poll::Pending,
        };

        let outcome = match joined.map_err(|err| join_failure(this.action, err)) {
            Ok(Ok(result)) => Ok(Some(result)),
            Ok(Err(DispatchError::Cancelled)) | Err(DispatchError::Cancelled) => {
                tracing::trace!(action = %this.action.name(), "task abandoned after cancellation");
                Ok(None)
            }
            Ok(Err(err)) | Err(err) => Err(err),
        };
        Poll::Ready(outcome)
    }
}

impl<R> std::fmt::Debug for Task<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("action", &self.action)
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Handle of an asynchronous dispatch nested inside another action.
///
/// Awaiting yields the action's result, or [`DispatchError::Cancelled`] when
/// the shared tree was cancelled.
#[must_use = "dropping a subtask detaches it; the action keeps running"]
pub struct Subtask<R> {
    handle: Handle<R>,
    token: CancelToken,
    action: ActionRef,
}

impl<R> Subtask<R> {
    pub(crate) fn new(handle: Handle<R>, token: CancelToken, action: ActionRef) -> Self {
        Self {
            handle,
            token,
            action,
        }
    }

    /// Cancel the whole action tree this subtask belongs to.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the action tree has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The dispatched action.
    pub fn action(&self) -> ActionRef {
        self.action
    }
}

impl<R> Future for Subtask<R> {
    type Output = Result<R, DispatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.handle).poll(cx).map(|joined| {
            joined
                .map_err(|err| join_failure(this.action, err))
                .and_then(|result| result)
        })
    }
}

impl<R> std::fmt::Debug for Subtask<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subtask")
            .field("action", &self.action)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
