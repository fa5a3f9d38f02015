//! Fetch capability used by every stage of the pipeline
//!
//! The rest of the crate only sees the `Transport` trait. Two implementations exist:
//! - `DirectTransport`: plain reqwest requests carrying the configured session cookies
//! - `RelayTransport`: requests proxied through a challenge-solving relay, translated
//!   back into an ordinary `FetchedPage`
//!
//! Which one is used is a run-time choice (`[transport].kind` or `--transport`).

mod direct;
mod relay;

pub use crate::config::TransportKind;
pub use direct::DirectTransport;
pub use relay::{RelayRequest, RelayResponse, RelaySolution, RelayTransport};

use crate::config::{Config, CookieEntry};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Content type assumed when a response does not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid relay endpoint '{endpoint}': {reason}")]
    Endpoint { endpoint: String, reason: String },

    #[error("Failed to encode relay request for {url}: {source}")]
    Encode {
        url: String,
        source: serde_json::Error,
    },

    #[error("Failed to decode relay response for {url}: {body}")]
    Decode { url: String, body: String },

    #[error("Relay error for {url}: {message}")]
    Relay { url: String, message: String },
}

/// A cookie as exchanged with the relay and attached to direct requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
}

impl SessionCookie {
    /// Returns true if this cookie should be sent to `host`
    ///
    /// An empty domain matches every host; otherwise the host must equal the domain or
    /// be one of its subdomains.
    pub fn applies_to(&self, host: &str) -> bool {
        let domain = self.domain.trim_start_matches('.');
        domain.is_empty()
            || host.eq_ignore_ascii_case(domain)
            || host
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", domain.to_ascii_lowercase()))
    }
}

impl From<&CookieEntry> for SessionCookie {
    fn from(entry: &CookieEntry) -> Self {
        Self {
            name: entry.name.clone(),
            value: entry.value.clone(),
            domain: entry.domain.clone(),
        }
    }
}

/// An outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
        }
    }
}

/// A fetched page, independent of how it was fetched
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: Url,

    /// URL after any redirects the transport followed
    pub final_url: String,

    pub status: u16,

    pub headers: HeaderMap,

    /// Content-Type header value, `DEFAULT_CONTENT_TYPE` when the relay omits it
    pub content_type: String,

    pub body: String,

    /// Cookies the remote side set, as reported by the relay
    pub cookies: Vec<SessionCookie>,

    /// User agent the relay's browser used
    pub user_agent: Option<String>,
}

impl FetchedPage {
    /// Returns true for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if the body is HTML
    pub fn is_html(&self) -> bool {
        self.content_type.to_ascii_lowercase().contains("html")
    }
}

/// Trait for fetch implementations
///
/// Implementations must be shareable across the resolver's worker tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for log lines
    fn name(&self) -> &'static str;

    /// Performs one request
    ///
    /// HTTP error statuses are not errors here; they come back in `FetchedPage::status`.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchedPage, TransportError>;
}

/// Builds the transport selected by `kind`
///
/// # Arguments
///
/// * `config` - The full configuration (user agent, cookies, relay settings)
/// * `kind` - Which implementation to build; usually `config.transport.kind`
pub fn build_transport(
    config: &Config,
    kind: TransportKind,
) -> Result<Arc<dyn Transport>, TransportError> {
    let cookies: Vec<SessionCookie> = config.cookies.iter().map(SessionCookie::from).collect();

    let transport: Arc<dyn Transport> = match kind {
        TransportKind::Direct => Arc::new(DirectTransport::new(
            &config.scraper.user_agent,
            Duration::from_secs(config.transport.request_timeout_secs),
            cookies,
        )?),
        TransportKind::Relay => Arc::new(RelayTransport::new(
            &config.transport.relay_endpoint,
            config.transport.max_timeout,
            cookies,
        )?),
    };

    tracing::debug!("Using {} transport", transport.name());
    Ok(transport)
}
