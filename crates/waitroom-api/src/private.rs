// Private (operator) API client
//
// Token bookkeeping counters and the serving-counter control, only exposed
// to operators. Requests carry an optional `x-api-key` header injected as a
// default header at build time.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::http::decode_ready;
use crate::models::{
    ActiveTokensResponse, IncrementServingCounterRequest, IncrementServingCounterResponse,
};
use crate::transport::{TransportConfig, endpoint};

const API_KEY_HEADER: &str = "x-api-key";

/// HTTP client for the private waiting room API.
#[derive(Clone)]
pub struct PrivateClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PrivateClient {
    /// Create a client, optionally authenticating every request with an API key.
    pub fn new(
        base_url: Url,
        api_key: Option<&SecretString>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(key.expose_secret()).map_err(|_| {
                Error::Authentication {
                    message: "API key contains invalid header characters".into(),
                }
            })?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        Ok(Self {
            http: transport.build_client_with_headers(headers)?,
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

    /// Tokens issued for `event_id` that are unexpired and not yet completed.
    pub async fn num_active_tokens(&self, event_id: &str) -> Result<i64, Error> {
        let url = endpoint(&self.base_url, "num_active_tokens")?;
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .query(&[("event_id", event_id)])
            .send()
            .await?;
        let body: ActiveTokensResponse = decode_ready(resp).await?;
        Ok(body.active_tokens)
    }

    /// Request ids whose token expired without completing checkout.
    pub async fn expired_tokens(&self, event_id: &str) -> Result<Vec<String>, Error> {
        let url = endpoint(&self.base_url, "expired_tokens")?;
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .query(&[("event_id", event_id)])
            .send()
            .await?;
        decode_ready(resp).await
    }

    /// Let `increment_by` more users through by advancing the serving
    /// counter. Returns the counter after the increment.
    pub async fn increment_serving_counter(
        &self,
        event_id: &str,
        increment_by: i64,
    ) -> Result<i64, Error> {
        let url = endpoint(&self.base_url, "increment_serving_counter")?;
        debug!("POST {} (increment_by={})", url, increment_by);
        let resp = self
            .http
            .post(url)
            .json(&IncrementServingCounterRequest {
                event_id,
                increment_by,
            })
            .send()
            .await?;
        let body: IncrementServingCounterResponse = decode_ready(resp).await?;
        Ok(body.serving_num)
    }
}
