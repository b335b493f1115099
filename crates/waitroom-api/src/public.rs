// Public queue API client
//
// The unauthenticated surface every waiting user talks to: join the queue,
// look up the assigned position, watch the serving counter, and exchange a
// served request id for a token set.

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::http::{decode, decode_ready};
use crate::models::{
    AssignQueueNumRequest, AssignQueueNumResponse, GenerateTokenRequest, QueueNumber,
    ServingNumResponse, TokenSet, WaitingNumResponse,
};
use crate::transport::{TransportConfig, endpoint};

/// HTTP client for the public waiting room API.
#[derive(Clone)]
pub struct PublicClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PublicClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` includes the API stage, e.g.
    /// `https://abc.execute-api.us-east-1.amazonaws.com/api`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, Error> {
        let url = endpoint(&self.base_url, path)?;
        debug!("GET {}", url);
        let resp = self.http.get(url).query(query).send().await?;
        decode(resp).await
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Ask to join the queue for `event_id`.
    ///
    /// Queue numbers are assigned asynchronously by the backend; this
    /// returns the request id used to look the number up later.
    pub async fn assign_queue_num(&self, event_id: &str) -> Result<String, Error> {
        let url = endpoint(&self.base_url, "assign_queue_num")?;
        debug!("POST {}", url);
        let resp = self
            .http
            .post(url)
            .json(&AssignQueueNumRequest { event_id })
            .send()
            .await?;
        let body: AssignQueueNumResponse = decode_ready(resp).await?;
        Ok(body.api_request_id)
    }

    /// Look up the queue number assigned to `request_id`.
    ///
    /// Returns `None` while the backend has not processed the request yet.
    pub async fn queue_num(
        &self,
        event_id: &str,
        request_id: &str,
    ) -> Result<Option<QueueNumber>, Error> {
        self.get(
            "queue_num",
            &[("event_id", event_id), ("request_id", request_id)],
        )
        .await
    }

    /// The highest queue number currently allowed through.
    ///
    /// `None` when the counter has never been initialised for the event.
    pub async fn serving_num(&self, event_id: &str) -> Result<Option<i64>, Error> {
        let body: Option<ServingNumResponse> =
            self.get("serving_num", &[("event_id", event_id)]).await?;
        Ok(body.and_then(|b| b.serving_counter))
    }

    /// Users queued that have not been issued a token yet.
    pub async fn waiting_num(&self, event_id: &str) -> Result<i64, Error> {
        let body: Option<WaitingNumResponse> =
            self.get("waiting_num", &[("event_id", event_id)]).await?;
        body.map(|b| b.waiting_num).ok_or(Error::UnexpectedStatus {
            status: 202,
            body: String::new(),
        })
    }

    /// Exchange a served request id for a token set.
    ///
    /// Returns `None` while the request is not being served yet, and
    /// [`Error::Expired`] once its position or token lapsed. Repeated calls
    /// for the same request id return the same tokens.
    pub async fn generate_token(
        &self,
        event_id: &str,
        request_id: &str,
    ) -> Result<Option<TokenSet>, Error> {
        let url = endpoint(&self.base_url, "generate_token")?;
        debug!("POST {}", url);
        let resp = self
            .http
            .post(url)
            .json(&GenerateTokenRequest {
                event_id,
                request_id,
            })
            .send()
            .await?;
        decode(resp).await
    }
}
