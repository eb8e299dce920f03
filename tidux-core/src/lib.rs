//! Core dispatch machinery for tidux
//!
//! This crate provides a minimal flux-style dispatch core: actions are run,
//! their outcome is broadcast to subscribers, and view-layer consumers re-render
//! only when the slice of state they select actually changed.
//!
//! # Core Concepts
//!
//! - **Action**: a named behavior, either [`SyncAction`], [`AsyncAction`] or a
//!   body-less [`Marker`]
//! - **Dispatcher**: runs actions and broadcasts `{action, payload, result}`
//!   to every subscriber
//! - **DispatchContext**: handed to action bodies for nested dispatch and
//!   `until`, bound to the tree's [`CancelToken`]
//! - **Task**: cancellable handle to an asynchronous dispatch
//! - **SelectorBinding**: re-runs a selector after each broadcast and requests a
//!   render when the [`Selection`] changed
//!
//! # Basic Example
//!
//! ```
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use std::sync::Arc;
//! use tidux_core::prelude::*;
//!
//! let dispatcher = Dispatcher::new();
//! let count = Arc::new(AtomicI32::new(0));
//!
//! let counter = count.clone();
//! let increase = SyncAction::new("Increase", move |_: (), _ctx| {
//!     Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
//! });
//!
//! let broadcasts = Arc::new(AtomicI32::new(0));
//! let seen = broadcasts.clone();
//! dispatcher.subscribe(move |params| {
//!     assert!(params.has_result());
//!     seen.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! dispatcher.dispatch(&increase, ()).unwrap();
//! dispatcher.dispatch(&increase, ()).unwrap();
//! assert_eq!(count.load(Ordering::SeqCst), 2);
//! assert_eq!(broadcasts.load(Ordering::SeqCst), 2);
//! ```
//!
//! # Async Actions and Cancellation
//!
//! An async action body receives an owned [`DispatchContext`]. Nested dispatches
//! through it share the root's cancellation token, and fail with
//! [`DispatchError::Cancelled`] once the tree is cancelled. Propagating that
//! error with `?` unwinds the body; the root [`Task`] then resolves to
//! `Ok(None)` and nothing is broadcast.
//!
//! ```ignore
//! let save = AsyncAction::new("Save", move |draft: Draft, ctx| {
//!     let validate = validate.clone();
//!     async move {
//!         ctx.dispatch(&validate, draft.clone())?;
//!         ctx.until([confirmed.id()])?.await?;
//!         api::save(&draft).await.map_err(DispatchError::failed)
//!     }
//! });
//!
//! let task = dispatcher.dispatch(&save, draft);
//! task.cancel();
//! assert!(task.await?.is_none());
//! ```

pub mod action;
pub mod cancel;
pub mod context;
pub mod debug;
pub mod dispatcher;
pub mod error;
pub mod global;
pub mod registry;
pub mod selection;
pub mod selector;
pub mod task;
pub mod testing;
pub mod until;

// Action exports
pub use action::{Action, ActionId, ActionRef, AsyncAction, Marker, SyncAction};

// Dispatch exports
pub use cancel::CancelToken;
pub use context::DispatchContext;
pub use dispatcher::{Dispatchable, Dispatcher};
pub use error::{BoxError, DispatchError, SelectorError};
pub use global::{dispatch, subscribe, subscribe_to, test_cleanup, until};
pub use registry::{Listener, ListenerParams, Subscription, SubscriptionGuard};
pub use task::{Subtask, Task};
pub use until::Until;

// Selector exports
pub use selection::{Identity, Selection};
pub use selector::{use_selector, RenderFlag, RenderHost, SelectorBinding};

// Testing exports
pub use testing::{Recorder, RenderCounter};

#[cfg(feature = "testing-time")]
pub use testing::{advance_time, pause_time, resume_time};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionId, AsyncAction, Marker, SyncAction};
    pub use crate::cancel::CancelToken;
    pub use crate::context::DispatchContext;
    pub use crate::dispatcher::{Dispatchable, Dispatcher};
    pub use crate::error::{DispatchError, SelectorError};
    pub use crate::registry::{Listener, ListenerParams, Subscription, SubscriptionGuard};
    pub use crate::selection::{Identity, Selection};
    pub use crate::selector::{use_selector, RenderFlag, RenderHost, SelectorBinding};
    pub use crate::task::{Subtask, Task};
    pub use crate::until::Until;
}
