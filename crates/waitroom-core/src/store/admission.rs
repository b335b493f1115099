// ── Admission client state ──
//
// Per-user record for one trip through the waiting room. The phase is
// never stored: it is recomputed from which identifiers are present.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use strum::{Display, IntoStaticStr};

use super::cell::{Mutation, StateCell, assign};
use crate::model::{Derived, Receipt, RequestId, Token};
use crate::stream::StateStream;

/// Where a user is in the admission flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Display)]
pub enum AdmissionPhase {
    /// No request id yet.
    Unregistered,
    /// Holding a request id, waiting for a token.
    Queued,
    /// Holding a token, checkout not completed.
    Admitted,
    /// Checkout completed.
    Completed,
}

/// A field combination the backend should never produce.
///
/// The store accepts these as-is (the poller owns sequencing); they are
/// surfaced so callers and tests can detect them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InvariantViolation {
    #[strum(serialize = "receipt set without a token")]
    ReceiptWithoutToken,
    #[strum(serialize = "token set without a request id")]
    TokenWithoutRequestId,
    #[strum(serialize = "position reported without a request id")]
    PositionWithoutRequestId,
}

/// The admission record.
#[derive(Clone, Default, PartialEq)]
pub struct AdmissionState {
    pub public_api_url: String,
    pub commerce_api_url: String,
    pub event_id: String,
    pub request_id: Option<RequestId>,
    pub my_position: u64,
    /// Latest serving counter: users with a position at or below it may
    /// request a token.
    pub queue_position: u64,
    pub token: Option<Token>,
    pub receipt: Option<Receipt>,
    pub launch_query_parameters: String,
}

impl AdmissionState {
    // ── Derived predicates ───────────────────────────────────────────

    pub fn has_request_id(&self) -> bool {
        self.request_id.is_some()
    }

    pub fn has_queue_position(&self) -> bool {
        self.my_position > 0
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn has_receipt(&self) -> bool {
        self.receipt.is_some()
    }

    pub fn phase(&self) -> AdmissionPhase {
        if self.has_receipt() {
            AdmissionPhase::Completed
        } else if self.has_token() {
            AdmissionPhase::Admitted
        } else if self.has_request_id() {
            AdmissionPhase::Queued
        } else {
            AdmissionPhase::Unregistered
        }
    }

    /// Users still ahead of this one. `Unknown` until both the position
    /// and the serving counter have been reported.
    pub fn people_ahead(&self) -> Derived<u64> {
        if self.has_queue_position() && self.queue_position > 0 {
            Derived::Known(self.my_position.saturating_sub(self.queue_position))
        } else {
            Derived::Unknown
        }
    }

    /// The serving counter has reached this user's position.
    pub fn is_being_served(&self) -> bool {
        self.has_queue_position() && self.queue_position >= self.my_position
    }

    pub fn violations(&self) -> Vec<InvariantViolation> {
        let mut out = Vec::new();
        if self.has_receipt() && !self.has_token() {
            out.push(InvariantViolation::ReceiptWithoutToken);
        }
        if self.has_token() && !self.has_request_id() {
            out.push(InvariantViolation::TokenWithoutRequestId);
        }
        if !self.has_request_id() && (self.my_position > 0 || self.queue_position > 0) {
            out.push(InvariantViolation::PositionWithoutRequestId);
        }
        out
    }
}

impl fmt::Debug for AdmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionState")
            .field("event_id", &self.event_id)
            .field("phase", &self.phase())
            .field("request_id", &self.request_id)
            .field("my_position", &self.my_position)
            .field("queue_position", &self.queue_position)
            .field("has_token", &self.has_token())
            .field("receipt", &self.receipt)
            .finish_non_exhaustive()
    }
}

/// The closed set of admission updates, one per field.
#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
pub enum AdmissionMutation {
    #[strum(serialize = "setPublicApiUrl")]
    SetPublicApiUrl(String),
    #[strum(serialize = "setCommerceApiUrl")]
    SetCommerceApiUrl(String),
    #[strum(serialize = "setEventId")]
    SetEventId(String),
    #[strum(serialize = "setRequestId")]
    SetRequestId(RequestId),
    #[strum(serialize = "setMyPosition")]
    SetMyPosition(u64),
    #[strum(serialize = "setQueuePosition")]
    SetQueuePosition(u64),
    #[strum(serialize = "setToken")]
    SetToken(Token),
    #[strum(serialize = "setReceipt")]
    SetReceipt(Receipt),
    #[strum(serialize = "setLaunchQueryParameters")]
    SetLaunchQueryParameters(String),
}

impl Mutation for AdmissionMutation {
    type State = AdmissionState;

    fn name(&self) -> &'static str {
        self.into()
    }

    fn apply(self, s: &mut AdmissionState) -> bool {
        match self {
            Self::SetPublicApiUrl(url) => assign(&mut s.public_api_url, url),
            Self::SetCommerceApiUrl(url) => assign(&mut s.commerce_api_url, url),
            Self::SetEventId(id) => assign(&mut s.event_id, id),
            Self::SetRequestId(id) => assign(&mut s.request_id, Some(id)),
            Self::SetMyPosition(p) => assign(&mut s.my_position, p),
            Self::SetQueuePosition(p) => assign(&mut s.queue_position, p),
            Self::SetToken(t) => assign(&mut s.token, Some(t)),
            Self::SetReceipt(r) => assign(&mut s.receipt, Some(r)),
            Self::SetLaunchQueryParameters(q) => assign(&mut s.launch_query_parameters, q),
        }
    }
}

/// Reactive store for one user's admission record.
pub struct AdmissionStore {
    cell: Arc<StateCell<AdmissionState>>,
}

impl AdmissionStore {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(StateCell::default()),
        }
    }

    pub(crate) fn cell(&self) -> &Arc<StateCell<AdmissionState>> {
        &self.cell
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub fn apply(&self, mutation: AdmissionMutation) -> bool {
        self.cell.apply(mutation)
    }

    pub fn set_public_api_url(&self, url: impl Into<String>) -> bool {
        self.apply(AdmissionMutation::SetPublicApiUrl(url.into()))
    }

    pub fn set_commerce_api_url(&self, url: impl Into<String>) -> bool {
        self.apply(AdmissionMutation::SetCommerceApiUrl(url.into()))
    }

    pub fn set_event_id(&self, id: impl Into<String>) -> bool {
        self.apply(AdmissionMutation::SetEventId(id.into()))
    }

    pub fn set_request_id(&self, id: RequestId) -> bool {
        self.apply(AdmissionMutation::SetRequestId(id))
    }

    pub fn set_my_position(&self, position: u64) -> bool {
        self.apply(AdmissionMutation::SetMyPosition(position))
    }

    pub fn set_queue_position(&self, position: u64) -> bool {
        self.apply(AdmissionMutation::SetQueuePosition(position))
    }

    pub fn set_token(&self, token: Token) -> bool {
        self.apply(AdmissionMutation::SetToken(token))
    }

    pub fn set_receipt(&self, receipt: Receipt) -> bool {
        self.apply(AdmissionMutation::SetReceipt(receipt))
    }

    pub fn set_launch_query_parameters(&self, query: impl Into<String>) -> bool {
        self.apply(AdmissionMutation::SetLaunchQueryParameters(query.into()))
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn has_request_id(&self) -> bool {
        self.cell.read(AdmissionState::has_request_id)
    }

    pub fn has_queue_position(&self) -> bool {
        self.cell.read(AdmissionState::has_queue_position)
    }

    pub fn has_token(&self) -> bool {
        self.cell.read(AdmissionState::has_token)
    }

    pub fn has_receipt(&self) -> bool {
        self.cell.read(AdmissionState::has_receipt)
    }

    pub fn phase(&self) -> AdmissionPhase {
        self.cell.read(AdmissionState::phase)
    }

    pub fn snapshot(&self) -> Arc<AdmissionState> {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> StateStream<AdmissionState> {
        self.cell.subscribe()
    }
}

impl Default for AdmissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rid(s: &str) -> RequestId {
        RequestId::new(s).unwrap()
    }

    fn tok(s: &str) -> Token {
        Token::new(s).unwrap()
    }

    #[test]
    fn fresh_store_is_unregistered_with_defaults() {
        let store = AdmissionStore::new();
        let s = store.snapshot();
        assert_eq!(s.phase(), AdmissionPhase::Unregistered);
        assert_eq!(s.my_position, 0);
        assert_eq!(s.queue_position, 0);
        assert!(!s.has_request_id() && !s.has_token() && !s.has_receipt());
        assert!(s.violations().is_empty());
    }

    #[test]
    fn full_progression_keeps_predicates_true() {
        let store = AdmissionStore::new();

        store.set_request_id(rid("req-1"));
        assert!(store.has_request_id());
        assert!(!store.has_token());
        assert_eq!(store.phase(), AdmissionPhase::Queued);

        store.set_token(tok("tok-1"));
        assert!(store.has_token());
        assert_eq!(store.phase(), AdmissionPhase::Admitted);

        store.set_receipt(Receipt::from("rcpt-1"));
        assert!(store.has_receipt());
        assert!(store.has_request_id() && store.has_token());
        assert_eq!(store.phase(), AdmissionPhase::Completed);
        assert!(store.snapshot().violations().is_empty());
    }

    #[test]
    fn queue_position_predicate_follows_my_position() {
        let store = AdmissionStore::new();
        store.set_request_id(rid("req-1"));

        store.set_my_position(5);
        assert!(store.has_queue_position());
        store.set_my_position(0);
        assert!(!store.has_queue_position());
    }

    #[test]
    fn position_may_move_backwards() {
        let store = AdmissionStore::new();
        store.set_request_id(rid("req-1"));
        store.set_my_position(3);
        assert!(store.set_my_position(8));
        assert_eq!(store.snapshot().my_position, 8);
    }

    #[test]
    fn token_without_request_id_is_accepted_but_flagged() {
        let store = AdmissionStore::new();
        store.set_token(tok("tok-1"));
        assert!(store.has_token());
        assert!(!store.has_request_id());
        assert_eq!(store.phase(), AdmissionPhase::Admitted);
        assert_eq!(
            store.snapshot().violations(),
            vec![InvariantViolation::TokenWithoutRequestId]
        );
    }

    #[test]
    fn receipt_without_token_is_flagged() {
        let store = AdmissionStore::new();
        store.set_request_id(rid("req-1"));
        store.set_receipt(Receipt::from("rcpt-1"));
        assert_eq!(store.phase(), AdmissionPhase::Completed);
        assert_eq!(
            store.snapshot().violations(),
            vec![InvariantViolation::ReceiptWithoutToken]
        );
    }

    #[test]
    fn position_before_joining_is_flagged() {
        let store = AdmissionStore::new();
        store.set_queue_position(10);
        assert_eq!(
            store.snapshot().violations(),
            vec![InvariantViolation::PositionWithoutRequestId]
        );
    }

    #[test]
    fn people_ahead_and_served() {
        let store = AdmissionStore::new();
        store.set_request_id(rid("req-1"));
        assert_eq!(store.snapshot().people_ahead(), Derived::Unknown);

        store.set_my_position(12);
        assert_eq!(store.snapshot().people_ahead(), Derived::Unknown);

        store.set_queue_position(10);
        assert_eq!(store.snapshot().people_ahead(), Derived::Known(2));
        assert!(!store.snapshot().is_being_served());

        store.set_queue_position(15);
        assert_eq!(store.snapshot().people_ahead(), Derived::Known(0));
        assert!(store.snapshot().is_being_served());
    }

    #[test]
    fn same_value_is_idempotent() {
        let store = AdmissionStore::new();
        assert!(store.set_request_id(rid("req-1")));
        assert!(!store.set_request_id(rid("req-1")));
        assert!(store.set_token(tok("tok-1")));
        assert!(!store.set_token(tok("tok-1")));
    }

    #[test]
    fn last_write_wins_for_tokens() {
        let store = AdmissionStore::new();
        store.set_token(tok("tok-1"));
        store.set_token(tok("tok-2"));
        assert_eq!(store.snapshot().token, Some(tok("tok-2")));
    }

    #[test]
    fn config_fields_have_mutations() {
        let store = AdmissionStore::new();
        store.set_public_api_url("https://q.example.com/api");
        store.set_commerce_api_url("https://shop.example.com/api");
        store.set_event_id("Sample");
        store.set_launch_query_parameters("?utm=launch");
        let s = store.snapshot();
        assert_eq!(s.public_api_url, "https://q.example.com/api");
        assert_eq!(s.commerce_api_url, "https://shop.example.com/api");
        assert_eq!(s.event_id, "Sample");
        assert_eq!(s.launch_query_parameters, "?utm=launch");
        assert_eq!(s.phase(), AdmissionPhase::Unregistered);
    }

    #[test]
    fn mutation_names_match_source_store() {
        assert_eq!(
            AdmissionMutation::SetRequestId(rid("r")).name(),
            "setRequestId"
        );
        assert_eq!(
            AdmissionMutation::SetLaunchQueryParameters(String::new()).name(),
            "setLaunchQueryParameters"
        );
    }
}
