// ── Reactive state streams ──
//
// Subscription handle for consuming record changes from a `StateCell`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A subscription to one state record.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct StateStream<S: Clone + Send + Sync + 'static> {
    current: Arc<S>,
    receiver: watch::Receiver<Arc<S>>,
}

impl<S: Clone + Send + Sync + 'static> StateStream<S> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<S>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Arc<S> {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Arc<S> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the owning cell has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<S>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The first item is the current snapshot.
    pub fn into_stream(self) -> StateWatchStream<S> {
        StateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct StateWatchStream<S: Clone + Send + Sync + 'static> {
    inner: WatchStream<Arc<S>>,
}

impl<S: Clone + Send + Sync + 'static> Stream for StateWatchStream<S> {
    type Item = Arc<S>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;
    use tokio_test::{assert_pending, assert_ready};

    use crate::store::{CapacityMutation, CapacityState, StateCell};

    #[test]
    fn changed_waits_for_a_real_change() {
        let cell = StateCell::<CapacityState>::default();
        cell.apply(CapacityMutation::SetServingCounter(1));
        let mut stream = cell.subscribe();
        assert_eq!(stream.current().serving_counter, Some(1));

        let mut next = tokio_test::task::spawn(stream.changed());
        assert_pending!(next.poll());

        cell.apply(CapacityMutation::SetServingCounter(1));
        assert!(!next.is_woken());

        cell.apply(CapacityMutation::SetServingCounter(2));
        assert!(next.is_woken());
        let snap = assert_ready!(next.poll()).unwrap();
        assert_eq!(snap.serving_counter, Some(2));
    }

    #[tokio::test]
    async fn into_stream_yields_current_then_updates() {
        let cell = StateCell::<CapacityState>::default();
        let mut stream = cell.subscribe().into_stream();

        let first = stream.next().await.unwrap();
        assert_eq!(first.active_tokens, None);

        cell.apply(CapacityMutation::SetActiveTokens(4));
        let second = stream.next().await.unwrap();
        assert_eq!(second.active_tokens, Some(4));
    }
}
