//! Selector bindings for view-layer consumers
//!
//! A [`SelectorBinding`] is the per-component state behind `use_selector`:
//! it re-runs a selector after every broadcast and asks its host to re-render
//! only when the result changed according to [`Selection`].
//!
//! The host supplies three things:
//!
//! 1. a slot that keeps the binding alive across renders of one component
//! 2. a [`RenderHost`] to request a re-render
//! 3. mount / unmount calls (`mount` after the first render, `unmount` or drop
//!    when the component goes away)
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use std::sync::Arc;
//! use tidux_core::{Dispatcher, RenderFlag, SelectorBinding, SyncAction};
//!
//! let dispatcher = Dispatcher::new();
//! let count = Arc::new(AtomicI32::new(0));
//!
//! let counter = count.clone();
//! let increase = SyncAction::new("Increase", move |_: (), _ctx| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(())
//! });
//!
//! let flag = RenderFlag::new();
//! let source = count.clone();
//! let mut binding =
//!     SelectorBinding::new(&dispatcher, flag.clone(), move || Some(source.load(Ordering::SeqCst)))
//!         .unwrap();
//! binding.mount();
//!
//! dispatcher.dispatch(&increase, ()).unwrap();
//! assert!(flag.take());
//! assert_eq!(binding.select().unwrap(), 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::dispatcher::Dispatcher;
use crate::error::SelectorError;
use crate::registry::Subscription;
use crate::selection::Selection;

/// Re-render primitive supplied by the view layer.
pub trait RenderHost: Send + Sync + 'static {
    /// Ask the host to re-render the owning component.
    fn request_render(&self);
}

impl<F> RenderHost for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn request_render(&self) {
        self()
    }
}

/// Dirty flag for poll-style render loops.
///
/// The loop checks [`take`](Self::take) once per frame and redraws when it
/// returns `true`.
#[derive(Clone, Debug, Default)]
pub struct RenderFlag(Arc<AtomicBool>);

impl RenderFlag {
    /// Create a clear flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a render as needed.
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether a render is pending, without clearing it.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether a render was pending.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl RenderHost for RenderFlag {
    fn request_render(&self) {
        self.set();
    }
}

type SelectorFn<T> = dyn Fn() -> Option<T> + Send + Sync;

struct BindingState<T> {
    selector: Mutex<Arc<SelectorFn<T>>>,
    previous: Mutex<T>,
    inert: AtomicBool,
    host: Box<dyn RenderHost>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> BindingState<T>
where
    T: Selection + Send + 'static,
{
    fn evaluate(&self) -> Option<T> {
        let selector = lock(&self.selector).clone();
        selector()
    }

    fn on_broadcast(&self) {
        if self.inert.load(Ordering::Acquire) {
            return;
        }

        let Some(next) = self.evaluate() else {
            tracing::warn!("selector produced no value during broadcast");
            return;
        };

        let changed = {
            let mut previous = lock(&self.previous);
            let changed = previous.changed(&next);
            *previous = next;
            changed
        };

        if changed && !self.inert.load(Ordering::Acquire) {
            tracing::trace!("selection changed, requesting render");
            self.host.request_render();
        }
    }
}

/// Per-consumer selector state.
pub struct SelectorBinding<T> {
    dispatcher: Dispatcher,
    state: Arc<BindingState<T>>,
    subscription: Option<Subscription>,
}

impl<T> SelectorBinding<T>
where
    T: Selection + Clone + Send + 'static,
{
    /// Create a binding and run the selector once.
    ///
    /// Fails with [`SelectorError::InvalidResult`] if the selector produces
    /// no value.
    pub fn new<H, F>(dispatcher: &Dispatcher, host: H, selector: F) -> Result<Self, SelectorError>
    where
        H: RenderHost,
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        let initial = selector().ok_or(SelectorError::InvalidResult)?;
        Ok(Self {
            dispatcher: dispatcher.clone(),
            state: Arc::new(BindingState {
                selector: Mutex::new(Arc::new(selector)),
                previous: Mutex::new(initial),
                inert: AtomicBool::new(false),
                host: Box::new(host),
            }),
            subscription: None,
        })
    }

    /// Re-run the current selector for a render.
    pub fn select(&self) -> Result<T, SelectorError> {
        let value = self.state.evaluate().ok_or(SelectorError::InvalidResult)?;
        *lock(&self.state.previous) = value.clone();
        Ok(value)
    }

    /// Replace the selector (it may capture new props) and run it for a render.
    pub fn select_with<F>(&self, selector: F) -> Result<T, SelectorError>
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        *lock(&self.state.selector) = Arc::new(selector);
        self.select()
    }

    /// The last value produced by the selector.
    pub fn current(&self) -> T {
        lock(&self.state.previous).clone()
    }

    /// Start listening for broadcasts.
    ///
    /// Mounting twice is a no-op; a binding cannot be mounted again after
    /// [`unmount`](Self::unmount).
    pub fn mount(&mut self) {
        if self.subscription.is_some() || self.state.inert.load(Ordering::Acquire) {
            return;
        }

        let weak: Weak<BindingState<T>> = Arc::downgrade(&self.state);
        self.subscription = Some(self.dispatcher.subscribe(move |_| {
            if let Some(state) = weak.upgrade() {
                state.on_broadcast();
            }
        }));
    }

    /// Stop listening and ignore any broadcast still in flight.
    pub fn unmount(&mut self) {
        self.state.inert.store(true, Ordering::Release);
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    /// Whether the binding is currently subscribed.
    pub fn is_mounted(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }
}

impl<T> Drop for SelectorBinding<T> {
    fn drop(&mut self) {
        self.state.inert.store(true, Ordering::Release);
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl<T> fmt::Debug for SelectorBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorBinding")
            .field("mounted", &self.subscription.is_some())
            .field("inert", &self.state.inert.load(Ordering::Acquire))
            .finish()
    }
}

/// Hook-style entry point: create the binding in `slot` on first render,
/// re-run the selector on later renders.
///
/// `host` is only used on the first render.
pub fn use_selector<T, H, F>(
    slot: &mut Option<SelectorBinding<T>>,
    dispatcher: &Dispatcher,
    host: H,
    selector: F,
) -> Result<T, SelectorError>
where
    T: Selection + Clone + Send + 'static,
    H: RenderHost,
    F: Fn() -> Option<T> + Send + Sync + 'static,
{
    if let Some(binding) = slot.as_ref() {
        return binding.select_with(selector);
    }

    let mut binding = SelectorBinding::new(dispatcher, host, selector)?;
    binding.mount();
    let value = binding.current();
    *slot = Some(binding);
    Ok(value)
}
