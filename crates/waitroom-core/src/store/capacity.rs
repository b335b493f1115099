// ── Capacity aggregator ──
//
// Four independently reported counters and the one value derived from
// them. Each counter starts unreported and is overwritten by every report
// that carries it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::IntoStaticStr;

use super::cell::{Mutation, StateCell, assign};
use crate::model::Derived;
use crate::stream::StateStream;

/// Operator-side counters. `None` = not reported yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapacityState {
    pub serving_counter: Option<i64>,
    pub waiting_room_size: Option<i64>,
    pub active_tokens: Option<i64>,
    pub expired_tokens: Option<i64>,
}

impl CapacityState {
    /// `serving - (waiting + active + expired)`.
    ///
    /// `Unknown` unless all four counters are reported. Negative results
    /// mean over-admission and are returned as-is. Arithmetic saturates at
    /// the `i64` bounds.
    pub fn remaining_capacity(&self) -> Derived<i64> {
        let (Some(serving), Some(waiting), Some(active), Some(expired)) = (
            self.serving_counter,
            self.waiting_room_size,
            self.active_tokens,
            self.expired_tokens,
        ) else {
            return Derived::Unknown;
        };

        let consumed = waiting.saturating_add(active).saturating_add(expired);
        Derived::Known(serving.saturating_sub(consumed))
    }

    /// All four counters have been reported at least once.
    pub fn is_complete(&self) -> bool {
        self.remaining_capacity().is_known()
    }
}

/// The closed set of capacity updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum CapacityMutation {
    #[strum(serialize = "setServingCounter")]
    SetServingCounter(i64),
    #[strum(serialize = "setWaitingRoomSize")]
    SetWaitingRoomSize(i64),
    #[strum(serialize = "setActiveTokens")]
    SetActiveTokens(i64),
    #[strum(serialize = "setExpiredTokens")]
    SetExpiredTokens(i64),
}

impl Mutation for CapacityMutation {
    type State = CapacityState;

    fn name(&self) -> &'static str {
        self.into()
    }

    fn apply(self, state: &mut CapacityState) -> bool {
        match self {
            Self::SetServingCounter(n) => assign(&mut state.serving_counter, Some(n)),
            Self::SetWaitingRoomSize(n) => assign(&mut state.waiting_room_size, Some(n)),
            Self::SetActiveTokens(n) => assign(&mut state.active_tokens, Some(n)),
            Self::SetExpiredTokens(n) => assign(&mut state.expired_tokens, Some(n)),
        }
    }
}

/// One poll's worth of counters; fields a source did not return stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapacityReport {
    pub serving_counter: Option<i64>,
    pub waiting_room_size: Option<i64>,
    pub active_tokens: Option<i64>,
    pub expired_tokens: Option<i64>,
}

impl CapacityReport {
    pub fn is_empty(&self) -> bool {
        self.mutations().is_empty()
    }

    /// One mutation per present field, in serving → waiting → active →
    /// expired order.
    pub fn mutations(&self) -> Vec<CapacityMutation> {
        [
            self.serving_counter.map(CapacityMutation::SetServingCounter),
            self.waiting_room_size.map(CapacityMutation::SetWaitingRoomSize),
            self.active_tokens.map(CapacityMutation::SetActiveTokens),
            self.expired_tokens.map(CapacityMutation::SetExpiredTokens),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Reactive store for the capacity aggregator.
pub struct CapacityStore {
    cell: Arc<StateCell<CapacityState>>,
}

impl CapacityStore {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(StateCell::default()),
        }
    }

    pub(crate) fn cell(&self) -> &Arc<StateCell<CapacityState>> {
        &self.cell
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub fn apply(&self, mutation: CapacityMutation) -> bool {
        self.cell.apply(mutation)
    }

    pub fn set_serving_counter(&self, n: i64) -> bool {
        self.apply(CapacityMutation::SetServingCounter(n))
    }

    pub fn set_waiting_room_size(&self, n: i64) -> bool {
        self.apply(CapacityMutation::SetWaitingRoomSize(n))
    }

    pub fn set_active_tokens(&self, n: i64) -> bool {
        self.apply(CapacityMutation::SetActiveTokens(n))
    }

    pub fn set_expired_tokens(&self, n: i64) -> bool {
        self.apply(CapacityMutation::SetExpiredTokens(n))
    }

    /// Apply each field of `report` as its own mutation. Returns `true` if
    /// any counter changed.
    pub fn apply_report(&self, report: &CapacityReport) -> bool {
        report
            .mutations()
            .into_iter()
            .fold(false, |changed, m| self.apply(m) | changed)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn remaining_capacity(&self) -> Derived<i64> {
        self.cell.read(CapacityState::remaining_capacity)
    }

    pub fn snapshot(&self) -> Arc<CapacityState> {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> StateStream<CapacityState> {
        self.cell.subscribe()
    }

    /// When a counter last changed, or `None` if nothing was reported yet.
    pub fn last_changed(&self) -> Option<DateTime<Utc>> {
        self.cell.changed_at()
    }
}

impl Default for CapacityStore {
    fn default() -> Self {
        Self::new()
    }
}
