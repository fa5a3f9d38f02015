//! Challenge-solving relay transport
//!
//! Every request becomes a JSON command `POST`ed to the relay endpoint:
//!
//! ```text
//! {"cmd":"request.get","url":"<target>","maxTimeout":60000,"cookies":[{"name","value","domain"}]}
//! ```
//!
//! The relay drives a real browser through the target's challenge and answers
//! synchronously with `{"status","message","solution":{...}}`. A `"ok"` status is turned
//! into a `FetchedPage`; anything else fails the fetch with the relay's message.

use crate::transport::{
    FetchRequest, FetchedPage, SessionCookie, Transport, TransportError, DEFAULT_CONTENT_TYPE,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Extra time granted on top of `maxTimeout` before the relay call itself times out
const RELAY_GRACE: Duration = Duration::from_secs(10);

/// Command payload sent to the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayRequest {
    pub cmd: String,
    pub url: String,
    #[serde(rename = "maxTimeout")]
    pub max_timeout: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<SessionCookie>,
}

impl RelayRequest {
    pub fn new(request: &FetchRequest, max_timeout: u64, cookies: &[SessionCookie]) -> Self {
        Self {
            cmd: format!("request.{}", request.method.as_str().to_ascii_lowercase()),
            url: request.url.to_string(),
            max_timeout,
            cookies: cookies.to_vec(),
        }
    }
}

/// Relay answer envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub solution: Option<RelaySolution>,
}

/// The page as the relay's browser saw it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelaySolution {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub cookies: Vec<SessionCookie>,
    #[serde(default, rename = "userAgent")]
    pub user_agent: String,
}

impl RelaySolution {
    /// Translates the solution into an ordinary fetched page
    ///
    /// Header names are matched case-insensitively; a missing Content-Type becomes
    /// `DEFAULT_CONTENT_TYPE` so HTML consumers accept the body.
    pub fn into_page(self, requested: Url) -> FetchedPage {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::trace!("Dropping unrepresentable relay header {}", name),
            }
        }

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            headers.insert(CONTENT_TYPE, value);
        }

        let final_url = if self.url.is_empty() {
            requested.to_string()
        } else {
            self.url
        };

        FetchedPage {
            url: requested,
            final_url,
            status: self.status,
            headers,
            content_type,
            body: self.response,
            cookies: self.cookies,
            user_agent: Some(self.user_agent).filter(|ua| !ua.is_empty()),
        }
    }
}

pub struct RelayTransport {
    client: Client,
    endpoint: String,
    max_timeout: u64,
    cookies: Vec<SessionCookie>,
}

impl RelayTransport {
    /// Builds a relay transport
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Relay command URL, e.g. `http://flaresolverr:8191/v1`
    /// * `max_timeout` - Milliseconds the relay may spend on one page
    /// * `cookies` - Session cookies forwarded in every command
    pub fn new(
        endpoint: &str,
        max_timeout: u64,
        cookies: Vec<SessionCookie>,
    ) -> Result<Self, TransportError> {
        let parsed = Url::parse(endpoint).map_err(|e| TransportError::Endpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(TransportError::Endpoint {
                endpoint: endpoint.to_string(),
                reason: "relay endpoint must use http or https".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(max_timeout) + RELAY_GRACE)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            max_timeout,
            cookies,
        })
    }
}

#[async_trait]
impl Transport for RelayTransport {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn fetch(&self, request: FetchRequest) -> Result<FetchedPage, TransportError> {
        let url_str = request.url.to_string();
        let payload = RelayRequest::new(&request, self.max_timeout, &self.cookies);
        let body = serde_json::to_vec(&payload).map_err(|source| TransportError::Encode {
            url: url_str.clone(),
            source,
        })?;

        tracing::debug!("Relay: requesting {} via {}", url_str, self.endpoint);

        let http_error = |source| TransportError::Http {
            url: url_str.clone(),
            source,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(http_error)?;
        let text = response.text().await.map_err(http_error)?;

        // The relay reports failures with a JSON envelope regardless of HTTP status.
        let envelope: RelayResponse =
            serde_json::from_str(&text).map_err(|_| TransportError::Decode {
                url: url_str.clone(),
                body: text.clone(),
            })?;

        if envelope.status != "ok" {
            return Err(TransportError::Relay {
                url: url_str,
                message: envelope.message,
            });
        }

        tracing::debug!("Relay: got response for {}", url_str);
        Ok(envelope
            .solution
            .unwrap_or_default()
            .into_page(request.url))
    }
}
