// ── Mutation queue ──
//
// Single-dispatch write path for a `StateCell`. Any number of producers
// hold a `MutationSender`; one dispatcher task drains the channel and
// applies mutations strictly in arrival order.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CoreError;
use crate::store::{Mutation, StateCell};

pub(crate) const MUTATION_CHANNEL_SIZE: usize = 64;

/// A mutation plus an optional reply slot for `apply` callers.
struct MutationEnvelope<M> {
    mutation: M,
    response_tx: Option<oneshot::Sender<bool>>,
}

/// Producer handle. Cheap to clone; all clones feed the same dispatcher.
pub struct MutationSender<M: Mutation> {
    tx: mpsc::Sender<MutationEnvelope<M>>,
    cell: Arc<StateCell<M::State>>,
}

impl<M: Mutation> Clone for MutationSender<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<M: Mutation> MutationSender<M> {
    /// Queue `mutation` and wait until it has been applied.
    ///
    /// Returns whether the record changed.
    pub async fn apply(&self, mutation: M) -> Result<bool, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(MutationEnvelope {
                mutation,
                response_tx: Some(tx),
            })
            .await
            .map_err(|_| CoreError::QueueClosed)?;

        rx.await.map_err(|_| CoreError::QueueClosed)
    }

    /// Queue `mutation` without waiting for it to be applied.
    pub async fn enqueue(&self, mutation: M) -> Result<(), CoreError> {
        self.tx
            .send(MutationEnvelope {
                mutation,
                response_tx: None,
            })
            .await
            .map_err(|_| CoreError::QueueClosed)
    }

    /// Current record as seen by the dispatcher.
    pub fn snapshot(&self) -> Arc<M::State> {
        self.cell.snapshot()
    }

    pub fn read<R>(&self, f: impl FnOnce(&M::State) -> R) -> R {
        self.cell.read(f)
    }
}

/// Owns the dispatcher task for one cell.
///
/// Dropping the queue cancels the dispatcher. Mutations that were already
/// dequeued finish; anything still buffered is discarded and its `apply`
/// caller sees [`CoreError::QueueClosed`].
pub struct MutationQueue<M: Mutation> {
    sender: MutationSender<M>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl<M: Mutation> MutationQueue<M> {
    /// Spawn the dispatcher. Must be called from within a Tokio runtime.
    pub fn spawn(cell: Arc<StateCell<M::State>>, cancel: CancellationToken) -> Self {
        Self::with_capacity(cell, MUTATION_CHANNEL_SIZE, cancel)
    }

    pub fn with_capacity(
        cell: Arc<StateCell<M::State>>,
        capacity: usize,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(dispatcher_task(
            Arc::clone(&cell),
            rx,
            cancel.clone(),
        ));

        Self {
            sender: MutationSender { tx, cell },
            cancel,
            handle: Some(handle),
        }
    }

    /// A new producer handle.
    pub fn sender(&self) -> MutationSender<M> {
        self.sender.clone()
    }

    /// Stop the dispatcher and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl<M: Mutation> Drop for MutationQueue<M> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Apply mutations from the channel one at a time until cancelled or every
/// sender is gone.
async fn dispatcher_task<M: Mutation>(
    cell: Arc<StateCell<M::State>>,
    mut rx: mpsc::Receiver<MutationEnvelope<M>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let changed = cell.apply(envelope.mutation);
                if let Some(tx) = envelope.response_tx {
                    let _ = tx.send(changed);
                }
            }
        }
    }
    debug!("mutation dispatcher stopped");
}
