// Response decoding shared by all clients.
//
// The waiting room backends answer with a small set of statuses:
// 200 carries the payload, 202 means "not yet" (queue number not assigned,
// position not served), 400 carries `{"error": "..."}`, 410 means the
// position or token expired.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::Error;

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Longest body excerpt carried in errors.
const BODY_PREVIEW: usize = 200;

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW).collect()
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| preview(body))
}

/// Decode a response, returning `None` for HTTP 202.
pub(crate) async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Option<T>, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;
    trace!(%status, body = %preview(&body), "response");

    match status {
        StatusCode::OK => serde_json::from_str(&body).map(Some).map_err(|e| {
            Error::Deserialization {
                message: format!("{e} (body preview: {:?})", preview(&body)),
                body,
            }
        }),
        StatusCode::ACCEPTED => Ok(None),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Authentication {
            message: format!("HTTP {}: {}", status.as_u16(), error_message(&body)),
        }),
        StatusCode::GONE => Err(Error::Expired {
            message: error_message(&body),
        }),
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => Err(Error::Rejected {
            message: error_message(&body),
            status: status.as_u16(),
        }),
        _ => Err(Error::UnexpectedStatus {
            status: status.as_u16(),
            body: preview(&body),
        }),
    }
}

/// Decode a response that must carry a payload; a 202 is an error here.
pub(crate) async fn decode_ready<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    decode(resp).await?.ok_or(Error::UnexpectedStatus {
        status: StatusCode::ACCEPTED.as_u16(),
        body: String::new(),
    })
}
