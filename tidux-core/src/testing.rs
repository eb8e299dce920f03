//! Test utilities for tidux applications
//!
//! - [`Recorder`]: listener that keeps every broadcast for later assertions
//! - [`RenderCounter`]: [`RenderHost`] that counts render requests
//! - Assertion macros for verifying broadcasts
//! - Time control for delayed async actions (`testing-time` feature)
//!
//! # Example
//!
//! ```
//! use tidux_core::testing::Recorder;
//! use tidux_core::{assert_broadcast, assert_not_broadcast, count_broadcasts};
//! use tidux_core::{Dispatcher, SyncAction};
//!
//! let dispatcher = Dispatcher::new();
//! let recorder = Recorder::new();
//! recorder.attach(&dispatcher);
//!
//! let add = SyncAction::new("Add", |n: i32, _ctx| Ok(n + 1));
//! let reset = SyncAction::new("Reset", |_: (), _ctx| Ok(()));
//! dispatcher.dispatch(&add, 1).unwrap();
//! dispatcher.dispatch(&add, 2).unwrap();
//!
//! assert_broadcast!(recorder, &add);
//! assert_not_broadcast!(recorder, &reset);
//! assert_eq!(count_broadcasts!(recorder, &add), 2);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::action::{Action, ActionId};
use crate::dispatcher::Dispatcher;
use crate::registry::{ListenerParams, Subscription};
use crate::selector::RenderHost;

/// Listener that records every broadcast it sees.
///
/// Clones share the same record list.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<ListenerParams>>>,
}

impl Recorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn seen(&self) -> MutexGuard<'_, Vec<ListenerParams>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to every broadcast of `dispatcher`.
    pub fn attach(&self, dispatcher: &Dispatcher) -> Subscription {
        let sink = self.clone();
        dispatcher.subscribe(move |params| sink.seen().push(params.clone()))
    }

    /// Every recorded broadcast, oldest first.
    pub fn records(&self) -> Vec<ListenerParams> {
        self.seen().clone()
    }

    /// Names of the recorded actions, oldest first.
    pub fn names(&self) -> Vec<&'static str> {
        self.seen().iter().map(|p| p.action().name()).collect()
    }

    /// Identities of the recorded actions, oldest first.
    pub fn ids(&self) -> Vec<ActionId> {
        self.seen().iter().map(|p| p.action().id()).collect()
    }

    /// How many broadcasts came from `action`.
    pub fn count_of<A: Action + ?Sized>(&self, action: &A) -> usize {
        self.seen().iter().filter(|p| p.is(action)).count()
    }

    /// Number of recorded broadcasts.
    pub fn len(&self) -> usize {
        self.seen().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.seen().is_empty()
    }

    /// Take every recorded broadcast, leaving the recorder empty.
    pub fn drain(&self) -> Vec<ListenerParams> {
        std::mem::take(&mut *self.seen())
    }
}

/// [`RenderHost`] that counts render requests.
#[derive(Clone, Debug, Default)]
pub struct RenderCounter(Arc<AtomicUsize>);

impl RenderCounter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render requests so far.
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Return the count and reset it to zero.
    pub fn take(&self) -> usize {
        self.0.swap(0, Ordering::SeqCst)
    }
}

impl RenderHost for RenderCounter {
    fn request_render(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Assert that `action` was broadcast to a [`Recorder`].
///
/// # Example
///
/// ```ignore
/// assert_broadcast!(recorder, &increase);
/// ```
#[macro_export]
macro_rules! assert_broadcast {
    ($recorder:expr, $action:expr) => {
        assert!(
            $recorder.count_of($action) > 0,
            "Expected `{}` to be broadcast, but got: {:?}",
            stringify!($action),
            $recorder.names()
        );
    };
}

/// Assert that `action` was NOT broadcast to a [`Recorder`].
#[macro_export]
macro_rules! assert_not_broadcast {
    ($recorder:expr, $action:expr) => {
        assert!(
            $recorder.count_of($action) == 0,
            "Expected `{}` NOT to be broadcast, but got: {:?}",
            stringify!($action),
            $recorder.names()
        );
    };
}

/// Count the broadcasts of `action` seen by a [`Recorder`].
#[macro_export]
macro_rules! count_broadcasts {
    ($recorder:expr, $action:expr) => {
        $recorder.count_of($action)
    };
}

/// Pause tokio time so delayed actions only progress through [`advance_time`].
///
/// Must be called from a current-thread runtime (`#[tokio::test]` default).
#[cfg(feature = "testing-time")]
pub fn pause_time() {
    tokio::time::pause();
}

/// Move paused tokio time forward and let due timers fire.
#[cfg(feature = "testing-time")]
pub async fn advance_time(duration: std::time::Duration) {
    tokio::time::advance(duration).await;
}

/// Resume normal tokio time.
#[cfg(feature = "testing-time")]
pub fn resume_time() {
    tokio::time::resume();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Marker, SyncAction};
    use crate::selector::SelectorBinding;

    #[test]
    fn test_recorder_collects_in_order() {
        let dispatcher = Dispatcher::new();
        let recorder = Recorder::new();
        let sub = recorder.attach(&dispatcher);

        let start = Marker::<()>::new("Start");
        let stop = Marker::<()>::new("Stop");
        dispatcher.dispatch(&start, ());
        dispatcher.dispatch(&stop, ());
        dispatcher.dispatch(&start, ());

        assert_eq!(recorder.names(), vec!["Start", "Stop", "Start"]);
        assert_eq!(recorder.ids(), vec![start.id(), stop.id(), start.id()]);
        assert_eq!(count_broadcasts!(recorder, &start), 2);

        sub.unsubscribe();
        dispatcher.dispatch(&stop, ());
        assert_eq!(recorder.len(), 3);
    }

    #[test]
    fn test_drain_empties() {
        let dispatcher = Dispatcher::new();
        let recorder = Recorder::new();
        recorder.attach(&dispatcher);

        let add = SyncAction::new("Add", |n: i32, _ctx| Ok(n + 1));
        dispatcher.dispatch(&add, 1).unwrap();

        let drained = recorder.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].result::<i32>(), Some(&2));
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_assertion_macros() {
        let dispatcher = Dispatcher::new();
        let recorder = Recorder::new();
        recorder.attach(&dispatcher);

        let seen = Marker::<()>::new("Seen");
        let unseen = Marker::<()>::new("Unseen");
        dispatcher.dispatch(&seen, ());

        assert_broadcast!(recorder, &seen);
        assert_not_broadcast!(recorder, &unseen);
    }

    #[test]
    #[should_panic(expected = "to be broadcast, but got")]
    fn test_assert_broadcast_fails() {
        let recorder = Recorder::new();
        let unseen = Marker::<()>::new("Unseen");
        assert_broadcast!(recorder, &unseen);
    }

    #[test]
    fn test_render_counter() {
        let dispatcher = Dispatcher::new();
        let counter = RenderCounter::new();
        let flip = Marker::<()>::new("Flip");
        let toggled = Arc::new(AtomicUsize::new(0));

        let t = toggled.clone();
        dispatcher.subscribe(move |_| {
            t.fetch_add(1, Ordering::SeqCst);
        });

        let source = toggled.clone();
        let mut binding = SelectorBinding::new(&dispatcher, counter.clone(), move || {
            Some(source.load(Ordering::SeqCst) % 2 == 0)
        })
        .unwrap();
        binding.mount();

        dispatcher.dispatch(&flip, ());
        dispatcher.dispatch(&flip, ());
        assert_eq!(counter.take(), 2);
        assert_eq!(counter.count(), 0);
    }

    #[cfg(feature = "testing-time")]
    #[tokio::test]
    async fn test_delayed_action_broadcasts_only_after_delay() {
        use crate::action::AsyncAction;
        use std::time::Duration;

        pause_time();
        let dispatcher = Dispatcher::new();
        let recorder = Recorder::new();
        recorder.attach(&dispatcher);

        let delayed = AsyncAction::new("Delayed", |ms: u64, _ctx| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(ms)
        });

        let task = dispatcher.dispatch(&delayed, 40);
        // Let the action start its timer.
        tokio::task::yield_now().await;

        advance_time(Duration::from_millis(39)).await;
        assert_not_broadcast!(recorder, &delayed);

        advance_time(Duration::from_millis(2)).await;
        assert_eq!(task.await.unwrap(), Some(40));
        assert_eq!(count_broadcasts!(recorder, &delayed), 1);

        resume_time();
    }
}
