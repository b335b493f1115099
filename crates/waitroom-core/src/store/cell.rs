// ── Reactive state container ──
//
// One record behind a `watch` channel. Typed mutations are the only write
// path; reads borrow the current `Arc` snapshot and never block writers
// for longer than a pointer clone.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::trace;

use crate::stream::StateStream;

/// A single named update to one field of a state record.
///
/// Implemented by a closed enum per record, so an unrecognized mutation
/// cannot be expressed at all.
pub trait Mutation: fmt::Debug + Send + 'static {
    type State: Clone + Send + Sync + 'static;

    /// Source-compatible mutation name (e.g. `"setRequestId"`).
    fn name(&self) -> &'static str;

    /// Write the field. Returns `true` if the record changed.
    fn apply(self, state: &mut Self::State) -> bool;
}

/// Overwrite `slot` with `value`, reporting whether it differed.
pub(crate) fn assign<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Bookkeeping kept next to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellMeta {
    /// Bumped on every mutation that changed the record.
    pub version: u64,
    /// Wall-clock time of the last change, `None` before the first.
    pub changed_at: Option<DateTime<Utc>>,
}

/// Holds one mutable record and broadcasts every change.
///
/// `apply` runs to completion under the channel's write lock, so readers
/// never observe a half-applied mutation. Re-applying a value the record
/// already holds is a no-op and does not wake subscribers.
pub struct StateCell<S: Clone + Send + Sync + 'static> {
    state: watch::Sender<Arc<S>>,
    meta: watch::Sender<CellMeta>,
}

impl<S: Clone + Send + Sync + 'static> StateCell<S> {
    pub fn new(initial: S) -> Self {
        let (state, _) = watch::channel(Arc::new(initial));
        let (meta, _) = watch::channel(CellMeta::default());
        Self { state, meta }
    }

    /// Apply one mutation. Returns `true` if the record changed.
    pub fn apply<M: Mutation<State = S>>(&self, mutation: M) -> bool {
        let name = mutation.name();
        // `send_if_modified` updates even with zero receivers. Meta is bumped
        // under the state lock, before subscribers are notified.
        let changed = self.state.send_if_modified(|current| {
            let changed = mutation.apply(Arc::make_mut(current));
            if changed {
                self.meta.send_modify(|m| {
                    m.version += 1;
                    m.changed_at = Some(Utc::now());
                });
            }
            changed
        });
        trace!(mutation = name, changed, version = self.version(), "mutation applied");
        changed
    }

    /// Run a pure function against the current record.
    ///
    /// Holds the read side of the channel for the duration of `f`; do not
    /// call `apply` from inside it.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Current record (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<S> {
        self.state.borrow().clone()
    }

    pub fn version(&self) -> u64 {
        self.meta.borrow().version
    }

    pub fn changed_at(&self) -> Option<DateTime<Utc>> {
        self.meta.borrow().changed_at
    }

    /// Subscribe to record changes.
    pub fn subscribe(&self) -> StateStream<S> {
        StateStream::new(self.state.subscribe())
    }
}

impl<S: Clone + Send + Sync + Default + 'static> Default for StateCell<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}
