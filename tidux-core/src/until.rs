//! One-shot waiter for dispatched actions

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio_util::sync::WaitForCancellationFutureOwned;

use crate::action::ActionId;
use crate::cancel::CancelToken;
use crate::error::DispatchError;
use crate::registry::{Listener, ListenerParams, Registry, Subscription};

/// Future returned by `until`.
///
/// Resolves with the [`ListenerParams`] of the first broadcast whose action is
/// in the watched set. The underlying subscription is removed as soon as it
/// fires, or when the `Until` is dropped unresolved.
///
/// Resolves to [`DispatchError::Detached`] if the registry is cleared first.
/// An `Until` obtained through a [`DispatchContext`](crate::DispatchContext)
/// also resolves to [`DispatchError::Cancelled`] once its tree is cancelled.
#[must_use = "futures do nothing unless awaited"]
pub struct Until {
    rx: oneshot::Receiver<ListenerParams>,
    subscription: Subscription,
    cancelled: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
}

impl Until {
    pub(crate) fn new(registry: &Arc<Registry>, actions: Vec<ActionId>) -> Self {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));

        let subscription = registry.add_with(move |handle| {
            Listener::new(move |params| {
                if !actions.contains(&params.action().id()) {
                    return;
                }
                let sender = tx.lock().unwrap_or_else(PoisonError::into_inner).take();
                if let Some(sender) = sender {
                    handle.unsubscribe();
                    let _ = sender.send(params.clone());
                }
            })
        });

        Self {
            rx,
            subscription,
            cancelled: None,
        }
    }

    /// Stop waiting once `token` is cancelled.
    pub(crate) fn bound_to(mut self, token: &CancelToken) -> Self {
        self.cancelled = Some(Box::pin(token.cancelled_owned()));
        self
    }

    /// Whether the waiter is still subscribed.
    pub fn is_pending(&self) -> bool {
        self.subscription.is_active()
    }
}

impl Future for Until {
    type Output = Result<ListenerParams, DispatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(cancelled) = this.cancelled.as_mut() {
            if cancelled.as_mut().poll(cx).is_ready() {
                this.subscription.unsubscribe();
                return Poll::Ready(Err(DispatchError::Cancelled));
            }
        }
        Pin::new(&mut this.rx)
            .poll(cx)
            .map(|received| received.map_err(|_| DispatchError::Detached))
    }
}

impl std::fmt::Debug for Until {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Until")
            .field("pending", &self.is_pending())
            .field("cancellable", &self.cancelled.is_some())
            .finish()
    }
}

impl Drop for Until {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, Marker};
    use std::time::Duration;

    fn broadcast(registry: &Registry, marker: &Marker<u32>, payload: u32) {
        registry.notify(&ListenerParams::new(
            marker.action_ref(),
            Arc::new(payload),
            None,
        ));
    }

    #[tokio::test]
    async fn test_resolves_on_first_match_only() {
        let registry = Arc::new(Registry::default());
        let a = Marker::<u32>::new("A");
        let b = Marker::<u32>::new("B");
        let ignored = Marker::<u32>::new("Ignored");

        let until = Until::new(&registry, vec![a.id(), b.id()]);
        assert_eq!(registry.len(), 1);

        broadcast(&registry, &ignored, 0);
        assert!(until.is_pending());

        broadcast(&registry, &b, 1);
        broadcast(&registry, &a, 2);
        assert_eq!(registry.len(), 0);

        let params = tokio::time::timeout(Duration::from_millis(100), until)
            .await
            .expect("timeout")
            .expect("resolved");
        assert!(params.is(&b));
        assert_eq!(params.payload::<u32>(), Some(&1));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let registry = Arc::new(Registry::default());
        let a = Marker::<u32>::new("A");

        let until = Until::new(&registry, vec![a.id()]);
        assert_eq!(registry.len(), 1);
        drop(until);
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_clear_detaches() {
        let registry = Arc::new(Registry::default());
        let a = Marker::<u32>::new("A");

        let until = Until::new(&registry, vec![a.id()]);
        registry.clear();

        let outcome = tokio::time::timeout(Duration::from_millis(100), until)
            .await
            .expect("timeout");
        assert!(matches!(outcome, Err(DispatchError::Detached)));
    }
}
