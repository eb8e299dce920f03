//! Free functions over the process-wide dispatcher
//!
//! Convenience for applications that only ever need one registry. Each
//! function forwards to [`Dispatcher::global`].

use crate::action::ActionId;
use crate::dispatcher::{Dispatchable, Dispatcher};
use crate::registry::{ListenerParams, Subscription};
use crate::until::Until;

/// Dispatch on the process-wide dispatcher.
pub fn dispatch<A>(action: &A, payload: A::Payload) -> A::Output
where
    A: Dispatchable,
{
    Dispatcher::global().dispatch(action, payload)
}

/// Subscribe to every broadcast of the process-wide dispatcher.
pub fn subscribe<F>(listener: F) -> Subscription
where
    F: Fn(&ListenerParams) + Send + Sync + 'static,
{
    Dispatcher::global().subscribe(listener)
}

/// Subscribe to broadcasts of the given actions on the process-wide dispatcher.
pub fn subscribe_to<I, F>(actions: I, listener: F) -> Subscription
where
    I: IntoIterator<Item = ActionId>,
    F: Fn(&ListenerParams) + Send + Sync + 'static,
{
    Dispatcher::global().subscribe_to(actions, listener)
}

/// Wait until one of `actions` is dispatched on the process-wide dispatcher.
pub fn until<I>(actions: I) -> Until
where
    I: IntoIterator<Item = ActionId>,
{
    Dispatcher::global().until(actions)
}

/// Remove every subscription from the process-wide dispatcher.
///
/// Call between test cases that share the global registry.
pub fn test_cleanup() {
    Dispatcher::global().clear();
}
