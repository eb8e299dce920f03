//! Subscription registry and broadcast
//!
//! Listeners are kept in insertion order. A broadcast snapshots the list before
//! calling anything, so listeners may subscribe, unsubscribe or dispatch from
//! inside their callback:
//!
//! - a listener added during a broadcast does not see that broadcast
//! - a listener removed during a broadcast is skipped if not yet reached
//! - a panicking listener is logged and the remaining listeners still run

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::action::{Action, ActionId, ActionRef};

type Erased = Arc<dyn Any + Send + Sync>;

/// The record broadcast to every subscriber after an action settles.
#[derive(Clone)]
pub struct ListenerParams {
    action: ActionRef,
    payload: Erased,
    result: Option<Erased>,
}

impl ListenerParams {
    pub(crate) fn new(action: ActionRef, payload: Erased, result: Option<Erased>) -> Self {
        Self {
            action,
            payload,
            result,
        }
    }

    /// The action that settled.
    pub fn action(&self) -> ActionRef {
        self.action
    }

    /// Whether the broadcast came from `action`.
    pub fn is<A: Action + ?Sized>(&self, action: &A) -> bool {
        self.action.id() == action.id()
    }

    /// The payload, if it has type `P`.
    pub fn payload<P: Any>(&self) -> Option<&P> {
        (*self.payload).downcast_ref::<P>()
    }

    /// The result, if there is one and it has type `R`.
    ///
    /// Marker actions never carry a result.
    pub fn result<R: Any>(&self) -> Option<&R> {
        self.result.as_deref()?.downcast_ref::<R>()
    }

    /// Whether the action produced a result.
    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }
}

impl fmt::Debug for ListenerParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerParams")
            .field("action", &self.action)
            .field("has_result", &self.has_result())
            .finish_non_exhaustive()
    }
}

type ListenerFn = dyn Fn(&ListenerParams) + Send + Sync;

/// A shareable listener callback.
///
/// Subscribing the same `Listener` (or a clone of it) twice keeps a single
/// registration. Plain closures passed to `subscribe` are wrapped in a fresh
/// `Listener` each time, so they never collapse.
#[derive(Clone)]
pub struct Listener(Arc<ListenerFn>);

impl Listener {
    /// Wrap a callback.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ListenerParams) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wrap this listener so it only runs for the given actions.
    pub fn filtered(self, actions: impl IntoIterator<Item = ActionId>) -> Self {
        let actions: Vec<ActionId> = actions.into_iter().collect();
        let inner = self;
        Self::new(move |params| {
            if actions.contains(&params.action().id()) {
                inner.call(params);
            }
        })
    }

    pub(crate) fn call(&self, params: &ListenerParams) {
        (self.0)(params)
    }

    fn same_as(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").finish()
    }
}

struct Entry {
    id: u64,
    listener: Listener,
    active: Arc<AtomicBool>,
}

/// Insertion-ordered listener collection.
#[derive(Default)]
pub(crate) struct Registry {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

impl Registry {
    fn entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        // Listeners never run while the lock is held, so a poisoned lock
        // still guards a consistent list.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener. Re-adding an already registered listener returns
    /// a handle to the existing registration.
    pub(crate) fn add(self: &Arc<Self>, listener: Listener) -> Subscription {
        let mut entries = self.entries();
        if let Some(existing) = entries.iter().find(|e| e.listener.same_as(&listener)) {
            return Subscription {
                registry: Arc::downgrade(self),
                id: existing.id,
                active: existing.active.clone(),
            };
        }

        let handle = self.reserve();
        entries.push(Entry {
            id: handle.id,
            listener,
            active: handle.active.clone(),
        });
        handle
    }

    /// Register a listener that needs its own subscription handle, such as
    /// one that removes itself after firing.
    pub(crate) fn add_with<F>(self: &Arc<Self>, make: F) -> Subscription
    where
        F: FnOnce(Subscription) -> Listener,
    {
        let handle = self.reserve();
        let listener = make(handle.clone());
        self.entries().push(Entry {
            id: handle.id,
            listener,
            active: handle.active.clone(),
        });
        handle
    }

    fn reserve(self: &Arc<Self>) -> Subscription {
        Subscription {
            registry: Arc::downgrade(self),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    fn remove(&self, id: u64) {
        self.entries().retain(|e| e.id != id);
    }

    /// Call every registered listener in insertion order.
    pub(crate) fn notify(&self, params: &ListenerParams) {
        let snapshot: Vec<(Listener, Arc<AtomicBool>)> = self
            .entries()
            .iter()
            .map(|e| (e.listener.clone(), e.active.clone()))
            .collect();

        for (listener, active) in snapshot {
            if !active.load(Ordering::Acquire) {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.call(params)));
            if let Err(panic) = outcome {
                tracing::error!(
                    action = %params.action().name(),
                    panic = %panic_message(panic.as_ref()),
                    "listener panicked during broadcast"
                );
            }
        }
    }

    /// Drop every registration.
    pub(crate) fn clear(&self) {
        let mut entries = self.entries();
        for entry in entries.iter() {
            entry.active.store(false, Ordering::Release);
        }
        entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping the handle does not unsubscribe; call [`unsubscribe`](Self::unsubscribe)
/// or convert it with [`into_guard`](Self::into_guard).
#[derive(Clone, Debug)]
pub struct Subscription {
    registry: Weak<Registry>,
    id: u64,
    active: Arc<AtomicBool>,
}

impl Subscription {
    /// Remove exactly this registration.
    ///
    /// Returns `true` if the listener was registered. Calling it again is a
    /// no-op returning `false`.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
        true
    }

    /// Whether the registration is still live.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Convert into a guard that unsubscribes when dropped.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard(self)
    }
}

/// Unsubscribes on drop.
#[derive(Debug)]
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct SubscriptionGuard(Subscription);

impl SubscriptionGuard {
    /// Whether the registration is still live.
    pub fn is_active(&self) -> bool {
        self.0.is_active()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.unsubscribe();
    }
}
