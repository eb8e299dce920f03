//! Action types and identity
//!
//! An action is a named unit of application behavior. Actions are compared by
//! identity: every constructor call allocates a fresh [`ActionId`], and clones
//! share it. Two actions built from the same closure are still two actions.
//!
//! The kind of an action is fixed when it is built:
//!
//! - [`SyncAction`] runs to completion inside `dispatch` and returns its value
//! - [`AsyncAction`] produces a future that is spawned onto the Tokio runtime
//! - [`Marker`] has no body at all; dispatching it only broadcasts

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::context::DispatchContext;
use crate::error::DispatchError;

static NEXT_ACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u64);

impl ActionId {
    fn next() -> Self {
        Self(NEXT_ACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for logging.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type-erased reference to an action: its identity plus its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionRef {
    id: ActionId,
    name: &'static str,
}

impl ActionRef {
    /// The action's identity.
    pub fn id(&self) -> ActionId {
        self.id
    }

    /// The action's name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Common surface of every dispatchable action.
pub trait Action {
    /// Identity used for subscription filtering and `until` matching.
    fn id(&self) -> ActionId;

    /// Name used for logging.
    fn name(&self) -> &'static str;

    /// Erased reference to this action.
    fn action_ref(&self) -> ActionRef {
        ActionRef {
            id: self.id(),
            name: self.name(),
        }
    }
}

type SyncBody<P, R> = dyn Fn(P, &DispatchContext) -> Result<R, DispatchError> + Send + Sync;
type AsyncBody<P, R> =
    dyn Fn(P, DispatchContext) -> BoxFuture<'static, Result<R, DispatchError>> + Send + Sync;

/// An action that completes synchronously.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use std::sync::Arc;
/// use tidux_core::{Dispatcher, SyncAction};
///
/// let count = Arc::new(AtomicI32::new(0));
/// let counter = count.clone();
/// let increase = SyncAction::new("Increase", move |by: i32, _ctx| {
///     Ok(counter.fetch_add(by, Ordering::SeqCst) + by)
/// });
///
/// let dispatcher = Dispatcher::new();
/// assert_eq!(dispatcher.dispatch(&increase, 2).unwrap(), 2);
/// ```
pub struct SyncAction<P, R> {
    id: ActionId,
    name: &'static str,
    body: Arc<SyncBody<P, R>>,
}

impl<P, R> SyncAction<P, R> {
    /// Create a new synchronous action.
    pub fn new<F>(name: &'static str, body: F) -> Self
    where
        F: Fn(P, &DispatchContext) -> Result<R, DispatchError> + Send + Sync + 'static,
    {
        Self {
            id: ActionId::next(),
            name,
            body: Arc::new(body),
        }
    }

    pub(crate) fn call(&self, payload: P, ctx: &DispatchContext) -> Result<R, DispatchError> {
        (self.body)(payload, ctx)
    }
}

impl<P, R> Clone for SyncAction<P, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name,
            body: self.body.clone(),
        }
    }
}

impl<P, R> fmt::Debug for SyncAction<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncAction")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl<P, R> Action for SyncAction<P, R> {
    fn id(&self) -> ActionId {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// An action whose body returns a future.
///
/// The body receives an owned [`DispatchContext`] so the returned future can
/// keep issuing nested dispatches after its first await point.
///
/// # Example
///
/// ```ignore
/// let load = AsyncAction::new("Load", |id: u32, ctx| async move {
///     let user = api::fetch_user(id).await.map_err(DispatchError::failed)?;
///     ctx.dispatch(&user_loaded, user.clone())?;
///     Ok(user)
/// });
/// ```
pub struct AsyncAction<P, R> {
    id: ActionId,
    name: &'static str,
    body: Arc<AsyncBody<P, R>>,
}

impl<P, R> AsyncAction<P, R> {
    /// Create a new asynchronous action.
    pub fn new<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: Fn(P, DispatchContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, DispatchError>> + Send + 'static,
    {
        Self {
            id: ActionId::next(),
            name,
            body: Arc::new(move |payload, ctx| body(payload, ctx).boxed()),
        }
    }

    pub(crate) fn call(
        &self,
        payload: P,
        ctx: DispatchContext,
    ) -> BoxFuture<'static, Result<R, DispatchError>> {
        (self.body)(payload, ctx)
    }
}

impl<P, R> Clone for AsyncAction<P, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name,
            body: self.body.clone(),
        }
    }
}

impl<P, R> fmt::Debug for AsyncAction<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncAction")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl<P, R> Action for AsyncAction<P, R> {
    fn id(&self) -> ActionId {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// An action with identity but no body.
///
/// Dispatching a marker performs no work and broadcasts with no result. Useful
/// for pure notifications that other code waits on with `until`.
pub struct Marker<P = ()> {
    id: ActionId,
    name: &'static str,
    _payload: PhantomData<fn(P)>,
}

impl<P> Marker<P> {
    /// Create a new marker action.
    pub fn new(name: &'static str) -> Self {
        Self {
            id: ActionId::next(),
            name,
            _payload: PhantomData,
        }
    }
}

impl<P> Clone for Marker<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for Marker<P> {}

impl<P> fmt::Debug for Marker<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marker")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl<P> Action for Marker<P> {
    fn id(&self) -> ActionId {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_per_construction() {
        let a = SyncAction::new("Same", |_: (), _| Ok(()));
        let b = SyncAction::new("Same", |_: (), _| Ok(()));

        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.clone().id());
        assert_eq!(a.name(), b.name());
    }

    #[test]
    fn test_action_ref() {
        let marker = Marker::<u8>::new("Ready");
        let r = marker.action_ref();
        assert_eq!(r.id(), marker.id());
        assert_eq!(r.name(), "Ready");
    }

    #[test]
    fn test_kinds_do_not_share_ids() {
        let sync = SyncAction::new("A", |_: (), _| Ok(1));
        let asynchronous = AsyncAction::new("A", |_: (), _| async { Ok(1) });
        let marker = Marker::<()>::new("A");

        assert_ne!(sync.id(), asynchronous.id());
        assert_ne!(asynchronous.id(), marker.id());
    }

    #[test]
    fn test_debug_shows_name() {
        let a = SyncAction::new("Increase", |_: (), _| Ok(()));
        assert!(format!("{:?}", a).contains("Increase"));
    }
}
