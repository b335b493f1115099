// Wire types for the waiting room APIs.
//
// Counters come out of Redis, so some endpoints return them as JSON
// strings ("42") and others as numbers. `counter` accepts both.

use serde::{Deserialize, Deserializer, Serialize};

// ── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct AssignQueueNumRequest<'a> {
    pub event_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateTokenRequest<'a> {
    pub event_id: &'a str,
    pub request_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct IncrementServingCounterRequest<'a> {
    pub event_id: &'a str,
    pub increment_by: i64,
}

// ── Responses ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct AssignQueueNumResponse {
    pub api_request_id: String,
}

/// Queue number assigned to a request id by `/queue_num`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueNumber {
    #[serde(deserialize_with = "counter")]
    pub queue_number: i64,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default, deserialize_with = "optional_counter")]
    pub entry_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServingNumResponse {
    #[serde(default, deserialize_with = "optional_counter")]
    pub serving_counter: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WaitingNumResponse {
    #[serde(deserialize_with = "counter")]
    pub waiting_num: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActiveTokensResponse {
    #[serde(deserialize_with = "counter")]
    pub active_tokens: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IncrementServingCounterResponse {
    #[serde(deserialize_with = "counter")]
    pub serving_num: i64,
}

/// JWT set returned by `/generate_token` once a request is being served.
#[derive(Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
}

fn bearer() -> String {
    "Bearer".into()
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

// ── Flexible counter decoding ───────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCounter {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawCounter {
    fn into_i64<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            Self::Int(n) => Ok(n),
            #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
            Self::Float(f) if f.fract() == 0.0 => Ok(f as i64),
            Self::Float(f) => Err(E::custom(format!("non-integer counter: {f}"))),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("non-numeric counter: {s:?}"))),
        }
    }
}

fn counter<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    RawCounter::deserialize(d)?.into_i64()
}

fn optional_counter<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Option::<RawCounter>::deserialize(d)?
        .map(RawCounter::into_i64)
        .transpose()
}
