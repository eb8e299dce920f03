//! Per-invocation dispatch context

use std::fmt;

use crate::action::ActionId;
use crate::cancel::CancelToken;
use crate::dispatcher::{Dispatchable, Dispatcher};
use crate::error::DispatchError;
use crate::until::Until;

/// Context handed to every action body.
///
/// `dispatch` and `until` are bound to the action tree's [`CancelToken`].
/// Both check the token first and fail with [`DispatchError::Cancelled`]
/// without doing any work once it is cancelled. Propagating that error with
/// `?` unwinds the action body; the outermost task swallows it.
///
/// Work an action performs without going through the context is not
/// interrupted by cancellation.
#[derive(Clone)]
pub struct DispatchContext {
    dispatcher: Dispatcher,
    token: CancelToken,
}

impl DispatchContext {
    pub(crate) fn new(dispatcher: Dispatcher, token: CancelToken) -> Self {
        Self { dispatcher, token }
    }

    /// Dispatch a nested action sharing this tree's cancellation token.
    ///
    /// Synchronous actions return their value, asynchronous actions return a
    /// [`Subtask`](crate::Subtask), markers return `()`.
    pub fn dispatch<A>(&self, action: &A, payload: A::Payload) -> Result<A::Nested, DispatchError>
    where
        A: Dispatchable,
    {
        self.token.check()?;
        action.dispatch_nested(&self.dispatcher, payload, &self.token)
    }

    /// Wait until one of `actions` is dispatched.
    ///
    /// The returned [`Until`] resolves to [`DispatchError::Cancelled`] if the
    /// tree is cancelled while it waits.
    pub fn until<I>(&self, actions: I) -> Result<Until, DispatchError>
    where
        I: IntoIterator<Item = ActionId>,
    {
        self.token.check()?;
        Ok(self.dispatcher.until(actions).bound_to(&self.token))
    }

    /// Cancel the whole action tree.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the action tree has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The shared cancellation token.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// The dispatcher this context dispatches through.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
