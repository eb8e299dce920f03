//! Cancellation token shared by an action tree

use tokio_util::sync::{
    CancellationToken, WaitForCancellationFuture, WaitForCancellationFutureOwned,
};

use crate::error::DispatchError;

/// A one-way cancel flag shared by every action in a dispatch tree.
///
/// A fresh token is created by each outermost `dispatch`. Nested dispatches
/// issued through a [`DispatchContext`](crate::DispatchContext) reuse it, so
/// cancelling the outer [`Task`](crate::Task) cancels everything it spawned.
/// Once cancelled, a token never reverts.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the token. Calling this again is a no-op.
    pub fn cancel(&self) {
        if self.inner.is_cancelled() {
            return;
        }
        tracing::trace!("cancelling dispatch tree");
        self.inner.cancel();
    }

    /// Whether the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Future that completes once the token is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.inner.cancelled()
    }

    pub(crate) fn cancelled_owned(&self) -> WaitForCancellationFutureOwned {
        self.inner.clone().cancelled_owned()
    }

    /// Fail with the cancellation signal if cancelled.
    pub(crate) fn check(&self) -> Result<(), DispatchError> {
        if self.is_cancelled() {
            Err(DispatchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_monotonic_and_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());

        token.cancel();
        token.cancel();

        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(DispatchError::Cancelled)));
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();

        other.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_future_wakes() {
        let token = CancelToken::new();
        let waiter = token.clone();

        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
            true
        });

        token.cancel();
        let woke = tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("timeout")
            .expect("join");
        assert!(woke);
    }
}
