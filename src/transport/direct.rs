//! Direct HTTP transport
//!
//! Sends requests straight to the target with a browser user agent and the configured
//! session cookies. Redirects are followed by reqwest (up to its default of 10 hops).

use crate::transport::{FetchRequest, FetchedPage, SessionCookie, Transport, TransportError};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::Client;
use std::time::Duration;

pub struct DirectTransport {
    client: Client,
    cookies: Vec<SessionCookie>,
}

impl DirectTransport {
    /// Builds the transport and its HTTP client
    ///
    /// # Arguments
    ///
    /// * `user_agent` - User-Agent header sent with every request
    /// * `timeout` - Whole-request timeout
    /// * `cookies` - Session cookies, attached to requests whose host they match
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        cookies: Vec<SessionCookie>,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self { client, cookies })
    }

    /// Value of the Cookie header for `host`, if any cookie applies
    fn cookie_header(&self, host: &str) -> Option<String> {
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|cookie| cookie.applies_to(host))
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}

#[async_trait]
impl Transport for DirectTransport {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, request: FetchRequest) -> Result<FetchedPage, TransportError> {
        let url_str = request.url.to_string();
        let mut builder = self.client.request(request.method.clone(), request.url.clone());

        if let Some(cookies) = request.url.host_str().and_then(|h| self.cookie_header(h)) {
            builder = builder.header(COOKIE, cookies);
        }

        let response = builder.send().await.map_err(|source| TransportError::Http {
            url: url_str.clone(),
            source,
        })?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.text().await.map_err(|source| TransportError::Http {
            url: url_str.clone(),
            source,
        })?;

        tracing::trace!("GET {} -> {} ({} bytes)", url_str, status, body.len());

        Ok(FetchedPage {
            url: request.url,
            final_url,
            status,
            headers,
            content_type,
            body,
            cookies: Vec::new(),
            user_agent: None,
        })
    }
}
