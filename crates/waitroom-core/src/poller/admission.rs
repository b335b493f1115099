// ── Admission poller ──
//
// Drives one user from "not queued" to "holding a token". Each tick looks
// up the user's position (until assigned), refreshes the serving counter
// and asks for a token once the counter has reached the position.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::QueueApi;
use crate::config::PollSettings;
use crate::error::CoreError;
use crate::model::{RequestId, Token};
use crate::queue::MutationSender;
use crate::store::{AdmissionMutation, AdmissionState};

/// What one poll tick achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still queued; `people_ahead` is `None` until both counters are known.
    Waiting { people_ahead: Option<u64> },
    /// A token is held.
    Admitted,
}

pub struct AdmissionPoller<Q> {
    api: Q,
    event_id: String,
    sender: MutationSender<AdmissionMutation>,
    poll: PollSettings,
}

impl<Q: QueueApi> AdmissionPoller<Q> {
    pub fn new(
        api: Q,
        event_id: impl Into<String>,
        sender: MutationSender<AdmissionMutation>,
        poll: PollSettings,
    ) -> Self {
        Self {
            api,
            event_id: event_id.into(),
            sender,
            poll,
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Ask the backend for a queue slot and record the request id.
    ///
    /// A user that already holds a request id keeps it.
    pub async fn join(&self) -> Result<RequestId, CoreError> {
        if let Some(existing) = self.sender.read(|s| s.request_id.clone()) {
            debug!(request_id = %existing, "already queued");
            return Ok(existing);
        }

        let request_id = self.api.assign_queue_num(&self.event_id).await?;
        self.sender
            .apply(AdmissionMutation::SetRequestId(request_id.clone()))
            .await?;
        info!(event_id = %self.event_id, request_id = %request_id, "joined waiting room");
        Ok(request_id)
    }

    /// One poll cycle.
    pub async fn tick(&self) -> Result<TickOutcome, CoreError> {
        let state = self.sender.snapshot();
        if state.has_token() {
            return Ok(TickOutcome::Admitted);
        }
        let Some(request_id) = state.request_id.clone() else {
            return Err(CoreError::NotQueued {
                operation: "poll".into(),
            });
        };

        if !state.has_queue_position() {
            if let Some(position) = self.api.queue_position(&self.event_id, &request_id).await? {
                self.sender
                    .apply(AdmissionMutation::SetMyPosition(position))
                    .await?;
                info!(position, "queue position assigned");
            }
        }

        if let Some(serving) = self.api.serving_counter(&self.event_id).await? {
            self.sender
                .apply(AdmissionMutation::SetQueuePosition(serving))
                .await?;
        }

        let state = self.sender.snapshot();
        debug!(
            position = state.my_position,
            serving = state.queue_position,
            "admission tick"
        );
        if !state.is_being_served() {
            return Ok(TickOutcome::Waiting {
                people_ahead: state.people_ahead().known(),
            });
        }

        match self.api.generate_token(&self.event_id, &request_id).await? {
            Some(token) => {
                self.sender.apply(AdmissionMutation::SetToken(token)).await?;
                info!(request_id = %request_id, "admitted");
                Ok(TickOutcome::Admitted)
            }
            None => Ok(TickOutcome::Waiting {
                people_ahead: Some(0),
            }),
        }
    }

    /// Poll until a token is held, the backend reports expiry, or `cancel`
    /// fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<Token, CoreError> {
        let mut interval = tokio::time::interval(self.poll.period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0_u32;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CoreError::Cancelled),
                _ = interval.tick() => {}
            }

            match self.tick().await {
                Ok(TickOutcome::Admitted) => {
                    return self
                        .sender
                        .read(|s| s.token.clone())
                        .ok_or_else(|| CoreError::Internal("admitted without a token".into()));
                }
                Ok(TickOutcome::Waiting { .. }) => failures = 0,
                Err(e) if e.is_transient() && failures < self.poll.max_consecutive_failures => {
                    failures += 1;
                    warn!(error = %e, failures, "admission poll failed, retrying");
                }
                Err(e) => {
                    if matches!(e, CoreError::Expired { .. }) {
                        warn!(error = %e, "admission expired, a new session is required");
                    }
                    return Err(e);
                }
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll.interval
    }

    pub fn state(&self) -> Arc<AdmissionState> {
        self.sender.snapshot()
    }
}
