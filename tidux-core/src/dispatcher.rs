//! Dispatch engine
//!
//! [`Dispatcher`] owns a subscription registry and runs actions against it.
//! The outcome of a dispatch depends on the action kind:
//!
//! | Action            | `Dispatcher::dispatch` returns | broadcast                     |
//! |-------------------|--------------------------------|-------------------------------|
//! | [`Marker`]        | `()`                           | always, without a result      |
//! | [`SyncAction`]    | `Result<R, DispatchError>`     | on `Ok`, before returning     |
//! | [`AsyncAction`]   | [`Task<R>`]                    | on success, before delivery   |
//!
//! Failed actions never broadcast. A cancelled asynchronous tree never
//! broadcasts and its outermost [`Task`] resolves to `Ok(None)`.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use tidux_core::{Dispatcher, SyncAction};
//!
//! let dispatcher = Dispatcher::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = seen.clone();
//! dispatcher.subscribe(move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! let double = SyncAction::new("Double", |n: i32, _ctx| Ok(n * 2));
//! assert_eq!(dispatcher.dispatch(&double, 21).unwrap(), 42);
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::action::{Action, ActionId, AsyncAction, Marker, SyncAction};
use crate::cancel::CancelToken;
use crate::context::DispatchContext;
use crate::error::DispatchError;
use crate::registry::{Listener, ListenerParams, Registry, Subscription};
use crate::task::{Subtask, Task};
use crate::until::Until;

/// Action kinds the engine knows how to run.
///
/// Implemented for [`SyncAction`], [`AsyncAction`] and [`Marker`]; the kind
/// decides the return types statically.
pub trait Dispatchable: Action {
    /// Value handed to the action.
    type Payload;
    /// Returned by an outermost dispatch.
    type Output;
    /// Returned by a nested dispatch through a [`DispatchContext`].
    type Nested;

    /// Run as the root of a new action tree.
    fn dispatch_root(&self, dispatcher: &Dispatcher, payload: Self::Payload) -> Self::Output;

    /// Run inside an existing action tree.
    fn dispatch_nested(
        &self,
        dispatcher: &Dispatcher,
        payload: Self::Payload,
        token: &CancelToken,
    ) -> Result<Self::Nested, DispatchError>;
}

/// Handle to a subscription registry and the engine that broadcasts into it.
///
/// Cloning is cheap; clones share the registry.
#[derive(Clone, Default)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    /// Create a dispatcher with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide dispatcher.
    ///
    /// Starts empty on first use and lives for the rest of the process. Only
    /// [`clear`](Self::clear) resets it.
    pub fn global() -> &'static Dispatcher {
        static GLOBAL: OnceLock<Dispatcher> = OnceLock::new();
        GLOBAL.get_or_init(Dispatcher::new)
    }

    /// Dispatch an action with a payload.
    ///
    /// An [`AsyncAction`] is spawned on the current Tokio runtime. Without
    /// one, the action never runs and its [`Task`] resolves to
    /// [`DispatchError::NoRuntime`].
    pub fn dispatch<A>(&self, action: &A, payload: A::Payload) -> A::Output
    where
        A: Dispatchable,
    {
        action.dispatch_root(self, payload)
    }

    /// Subscribe to every broadcast.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ListenerParams) + Send + Sync + 'static,
    {
        self.registry.add(Listener::new(listener))
    }

    /// Subscribe to broadcasts of the given actions only.
    pub fn subscribe_to<I, F>(&self, actions: I, listener: F) -> Subscription
    where
        I: IntoIterator<Item = ActionId>,
        F: Fn(&ListenerParams) + Send + Sync + 'static,
    {
        self.registry.add(Listener::new(listener).filtered(actions))
    }

    /// Subscribe a shared listener. Subscribing the same listener again
    /// returns a handle to the existing registration.
    pub fn subscribe_listener(&self, listener: Listener) -> Subscription {
        self.registry.add(listener)
    }

    /// Subscribe a shared listener to broadcasts of the given actions only.
    ///
    /// The filter wraps the listener, so every call adds a new registration.
    pub fn subscribe_listener_to<I>(&self, actions: I, listener: Listener) -> Subscription
    where
        I: IntoIterator<Item = ActionId>,
    {
        self.registry.add(listener.filtered(actions))
    }

    /// Wait until one of `actions` is dispatched.
    pub fn until<I>(&self, actions: I) -> Until
    where
        I: IntoIterator<Item = ActionId>,
    {
        Until::new(&self.registry, actions.into_iter().collect())
    }

    /// Broadcast `params` to every current subscriber.
    pub fn notify(&self, params: &ListenerParams) {
        self.registry.notify(params);
    }

    /// Remove every subscription. Intended for resetting shared state between
    /// test cases.
    pub fn clear(&self) {
        tracing::debug!(listeners = self.registry.len(), "clearing subscriptions");
        self.registry.clear();
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn run_marker<P>(&self, marker: &Marker<P>, payload: P)
    where
        P: Send + Sync + 'static,
    {
        tracing::debug!(action = %marker.name(), "dispatching marker");
        self.notify(&ListenerParams::new(
            marker.action_ref(),
            Arc::new(payload),
            None,
        ));
    }

    fn run_sync<P, R>(
        &self,
        action: &SyncAction<P, R>,
        payload: P,
        token: CancelToken,
    ) -> Result<R, DispatchError>
    where
        P: Clone + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        tracing::debug!(action = %action.name(), "dispatching action");
        let ctx = DispatchContext::new(self.clone(), token);
        let shared = Arc::new(payload.clone());

        match action.call(payload, &ctx) {
            Ok(result) => {
                tracing::debug!(action = %action.name(), "action settled");
                self.notify(&ListenerParams::new(
                    action.action_ref(),
                    shared,
                    Some(Arc::new(result.clone())),
                ));
                Ok(result)
            }
            Err(err) => {
                log_failure(action.name(), &err);
                Err(err)
            }
        }
    }

    fn spawn_async<P, R>(
        &self,
        action: &AsyncAction<P, R>,
        payload: P,
        token: CancelToken,
    ) -> Result<tokio::task::JoinHandle<Result<R, DispatchError>>, DispatchError>
    where
        P: Clone + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|err| {
            tracing::error!(
                action = %action.name(),
                error = %err,
                "async action needs a Tokio runtime"
            );
            DispatchError::NoRuntime {
                action: action.name(),
            }
        })?;
        tracing::debug!(action = %action.name(), "dispatching async action");
        let ctx = DispatchContext::new(self.clone(), token);
        let shared = Arc::new(payload.clone());
        let future = action.call(payload, ctx);
        let dispatcher = self.clone();
        let action = action.action_ref();

        Ok(runtime.spawn(async move {
            match future.await {
                Ok(result) => {
                    tracing::debug!(action = %action.name(), "async action settled");
                    dispatcher.notify(&ListenerParams::new(
                        action,
                        shared,
                        Some(Arc::new(result.clone())),
                    ));
                    Ok(result)
                }
                Err(err) => {
                    log_failure(action.name(), &err);
                    Err(err)
                }
            }
        }))
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

fn log_failure(action: &'static str, err: &DispatchError) {
    if err.is_cancelled() {
        tracing::trace!(action = %action, "action unwound by cancellation");
    } else {
        tracing::warn!(action = %action, error = %err, "action failed");
    }
}

impl<P> Dispatchable for Marker<P>
where
    P: Send + Sync + 'static,
{
    type Payload = P;
    type Output = ();
    type Nested = ();

    fn dispatch_root(&self, dispatcher: &Dispatcher, payload: P) {
        dispatcher.run_marker(self, payload);
    }

    fn dispatch_nested(
        &self,
        dispatcher: &Dispatcher,
        payload: P,
        _token: &CancelToken,
    ) -> Result<(), DispatchError> {
        dispatcher.run_marker(self, payload);
        Ok(())
    }
}

impl<P, R> Dispatchable for SyncAction<P, R>
where
    P: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    type Payload = P;
    type Output = Result<R, DispatchError>;
    type Nested = R;

    fn dispatch_root(&self, dispatcher: &Dispatcher, payload: P) -> Result<R, DispatchError> {
        dispatcher.run_sync(self, payload, CancelToken::new())
    }

    fn dispatch_nested(
        &self,
        dispatcher: &Dispatcher,
        payload: P,
        token: &CancelToken,
    ) -> Result<R, DispatchError> {
        dispatcher.run_sync(self, payload, token.clone())
    }
}

impl<P, R> Dispatchable for AsyncAction<P, R>
where
    P: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    type Payload = P;
    type Output = Task<R>;
    type Nested = Subtask<R>;

    fn dispatch_root(&self, dispatcher: &Dispatcher, payload: P) -> Task<R> {
        let token = CancelToken::new();
        match dispatcher.spawn_async(self, payload, token.clone()) {
            Ok(handle) => Task::new(handle, token, self.action_ref()),
            Err(_) => Task::unstarted(token, self.action_ref()),
        }
    }

    fn dispatch_nested(
        &self,
        dispatcher: &Dispatcher,
        payload: P,
        token: &CancelToken,
    ) -> Result<Subtask<R>, DispatchError> {
        let handle = dispatcher.spawn_async(self, payload, token.clone())?;
        Ok(Subtask::new(handle, token.clone(), self.action_ref()))
    }
}
