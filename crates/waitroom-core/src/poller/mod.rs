// ── Backend pollers ──
//
// Translate backend responses into store mutations. The traits below are
// the seams between core and `waitroom-api`; the HTTP clients implement
// them here and tests substitute in-memory fakes.

mod admission;
mod capacity;

use std::future::Future;

use waitroom_api::{CommerceClient, PrivateClient, PublicClient};

use crate::error::CoreError;
use crate::model::{Receipt, RequestId, Token};

pub use admission::{AdmissionPoller, TickOutcome};
pub use capacity::CapacityPoller;

// ── Seams ────────────────────────────────────────────────────────────

/// The user-facing queue endpoints.
pub trait QueueApi: Send + Sync {
    /// Join the queue; returns the request id to poll with.
    fn assign_queue_num(
        &self,
        event_id: &str,
    ) -> impl Future<Output = Result<RequestId, CoreError>> + Send;

    /// The user's position, `None` until the backend has assigned one.
    fn queue_position(
        &self,
        event_id: &str,
        request_id: &RequestId,
    ) -> impl Future<Output = Result<Option<u64>, CoreError>> + Send;

    /// The serving counter, `None` if it was never initialised.
    fn serving_counter(
        &self,
        event_id: &str,
    ) -> impl Future<Output = Result<Option<u64>, CoreError>> + Send;

    /// A token once the request is being served, `None` before that.
    fn generate_token(
        &self,
        event_id: &str,
        request_id: &RequestId,
    ) -> impl Future<Output = Result<Option<Token>, CoreError>> + Send;
}

/// The protected downstream site.
pub trait CommerceApi: Send + Sync {
    fn checkout(&self, token: &Token) -> impl Future<Output = Result<Receipt, CoreError>> + Send;
}

/// The four counters behind remaining capacity.
pub trait CounterApi: Send + Sync {
    fn serving_counter(
        &self,
        event_id: &str,
    ) -> impl Future<Output = Result<Option<i64>, CoreError>> + Send;

    fn waiting_room_size(
        &self,
        event_id: &str,
    ) -> impl Future<Output = Result<i64, CoreError>> + Send;

    fn active_tokens(&self, event_id: &str)
    -> impl Future<Output = Result<i64, CoreError>> + Send;

    fn expired_tokens(
        &self,
        event_id: &str,
    ) -> impl Future<Output = Result<i64, CoreError>> + Send;

    /// Advance the serving counter by `by`; returns the new counter.
    fn increment_serving_counter(
        &self,
        event_id: &str,
        by: i64,
    ) -> impl Future<Output = Result<i64, CoreError>> + Send;
}

// ── HTTP implementations ─────────────────────────────────────────────

/// Positions and counters count people; a negative one is a backend fault.
fn non_negative(what: &str, n: i64) -> Result<u64, CoreError> {
    u64::try_from(n).map_err(|_| CoreError::Api {
        message: format!("negative {what} {n}"),
        status: None,
    })
}

impl QueueApi for PublicClient {
    async fn assign_queue_num(&self, event_id: &str) -> Result<RequestId, CoreError> {
        let id = PublicClient::assign_queue_num(self, event_id).await?;
        RequestId::new(id)
    }

    async fn queue_position(
        &self,
        event_id: &str,
        request_id: &RequestId,
    ) -> Result<Option<u64>, CoreError> {
        let Some(assigned) = self.queue_num(event_id, request_id.as_str()).await? else {
            return Ok(None);
        };
        non_negative("queue number", assigned.queue_number).map(Some)
    }

    async fn serving_counter(&self, event_id: &str) -> Result<Option<u64>, CoreError> {
        let counter = self.serving_num(event_id).await?;
        counter.map(|n| non_negative("serving counter", n)).transpose()
    }

    async fn generate_token(
        &self,
        event_id: &str,
        request_id: &RequestId,
    ) -> Result<Option<Token>, CoreError> {
        PublicClient::generate_token(self, event_id, request_id.as_str())
            .await?
            .map(Token::try_from)
            .transpose()
    }
}

impl CommerceApi for CommerceClient {
    async fn checkout(&self, token: &Token) -> Result<Receipt, CoreError> {
        let body = CommerceClient::checkout(self, token.secret()).await?;
        Ok(Receipt::new(body))
    }
}

/// Counter sources for the operator view: the serving and waiting counts
/// come from the public API, token counts and the serving-counter control
/// from the private one.
#[derive(Clone)]
pub struct BackendCounters {
    pub public: PublicClient,
    pub private: PrivateClient,
}

impl CounterApi for BackendCounters {
    async fn serving_counter(&self, event_id: &str) -> Result<Option<i64>, CoreError> {
        Ok(self.public.serving_num(event_id).await?)
    }

    async fn waiting_room_size(&self, event_id: &str) -> Result<i64, CoreError> {
        Ok(self.public.waiting_num(event_id).await?)
    }

    async fn active_tokens(&self, event_id: &str) -> Result<i64, CoreError> {
        Ok(self.private.num_active_tokens(event_id).await?)
    }

    async fn expired_tokens(&self, event_id: &str) -> Result<i64, CoreError> {
        let expired = self.private.expired_tokens(event_id).await?;
        Ok(i64::try_from(expired.len()).unwrap_or(i64::MAX))
    }

    async fn increment_serving_counter(&self, event_id: &str, by: i64) -> Result<i64, CoreError> {
        Ok(self.private.increment_serving_counter(event_id, by).await?)
    }
}
