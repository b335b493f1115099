// Commerce API client
//
// The protected downstream site. Every call is authorized with the access
// token issued by the waiting room; the response body is kept opaque.

use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::http::decode_ready;
use crate::transport::{TransportConfig, endpoint};

/// HTTP client for the commerce (checkout) API.
#[derive(Clone)]
pub struct CommerceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CommerceClient {
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

    /// Complete checkout, returning the receipt body as-is.
    pub async fn checkout(&self, access_token: &SecretString) -> Result<serde_json::Value, Error> {
        let url = endpoint(&self.base_url, "checkout")?;
        debug!("GET {}", url);

        let mut auth = HeaderValue::from_str(access_token.expose_secret()).map_err(|_| {
            Error::Authentication {
                message: "access token contains invalid header characters".into(),
            }
        })?;
        auth.set_sensitive(true);

        let resp = self.http.get(url).header(AUTHORIZATION, auth).send().await?;
        decode_ready(resp).await
    }
}
