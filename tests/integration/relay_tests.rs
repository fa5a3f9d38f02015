//! Integration tests for the challenge-solving relay transport
//!
//! A wiremock server stands in for the relay: it receives the JSON commands and answers
//! with relay envelopes, so no target site is ever contacted.

use linkcrawl::config::{Config, TransportKind};
use linkcrawl::crawler::scrape;
use linkcrawl::output::load_catalog;
use linkcrawl::transport::{
    FetchRequest, RelayTransport, SessionCookie, Transport, TransportError, DEFAULT_CONTENT_TYPE,
};
use linkcrawl::LinkType;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn relay(server: &MockServer) -> RelayTransport {
    RelayTransport::new(&format!("{}/v1", server.uri()), 60_000, Vec::new()).unwrap()
}

fn solved(url: &str, body: &str) -> Value {
    json!({
        "status": "ok",
        "message": "Challenge not detected!",
        "solution": {
            "url": url,
            "status": 200,
            "headers": {},
            "response": body,
            "cookies": [{"name": "cf_clearance", "value": "token", "domain": ".existenz.se"}],
            "userAgent": "Mozilla/5.0 (X11; Linux x86_64)"
        }
    })
}

async fn mount_solution(server: &MockServer, url: &str, body: &str) {
    Mock::given(method("POST"))
        .and(path("/v1"))
        .and(body_partial_json(json!({ "cmd": "request.get", "url": url })))
        .respond_with(ResponseTemplate::new(200).set_body_json(solved(url, body)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_relay_ok_becomes_page() {
    let server = MockServer::start().await;
    mount_solution(&server, "https://existenz.se/", "<html>listing</html>").await;

    let page = relay(&server)
        .fetch(FetchRequest::get(Url::parse("https://existenz.se/").unwrap()))
        .await
        .unwrap();

    assert_eq!(page.status, 200);
    assert_eq!(page.body, "<html>listing</html>");
    assert_eq!(page.content_type, DEFAULT_CONTENT_TYPE);
    assert!(page.is_html());
    assert_eq!(page.cookies[0].name, "cf_clearance");
    assert_eq!(page.user_agent.as_deref(), Some("Mozilla/5.0 (X11; Linux x86_64)"));
}

#[tokio::test]
async fn test_relay_command_carries_timeout_and_cookies() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1"))
        .and(body_partial_json(json!({
            "cmd": "request.get",
            "url": "https://existenz.se/",
            "maxTimeout": 60000,
            "cookies": [{"name": "PHPSESSID", "value": "abc", "domain": "existenz.se"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(solved("https://existenz.se/", "")))
        .expect(1)
        .mount(&server)
        .await;

    let transport = RelayTransport::new(
        &format!("{}/v1", server.uri()),
        60_000,
        vec![SessionCookie {
            name: "PHPSESSID".to_string(),
            value: "abc".to_string(),
            domain: "existenz.se".to_string(),
        }],
    )
    .unwrap();

    transport
        .fetch(FetchRequest::get(Url::parse("https://existenz.se/").unwrap()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_relay_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "message": "Error: Error solving the challenge. Timeout after 60.0 seconds."
        })))
        .mount(&server)
        .await;

    let err = relay(&server)
        .fetch(FetchRequest::get(Url::parse("https://existenz.se/").unwrap()))
        .await
        .unwrap_err();

    match err {
        TransportError::Relay { url, message } => {
            assert_eq!(url, "https://existenz.se/");
            assert!(message.contains("Timeout after 60.0 seconds"));
        }
        other => panic!("expected a relay error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_relay_garbage_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = relay(&server)
        .fetch(FetchRequest::get(Url::parse("https://existenz.se/").unwrap()))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Decode { ref body, .. } if body == "Bad Gateway"));
}

#[tokio::test]
async fn test_scrape_through_relay() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let mut config = Config::for_listing("https://existenz.se/");
    config.transport.kind = TransportKind::Relay;
    config.transport.relay_endpoint = format!("{}/v1", server.uri());
    config.output.catalog_path = dir.path().join("links.json").display().to_string();

    mount_solution(
        &server,
        "https://existenz.se/",
        r#"<html><body>
             <div class="comment-date">Idag</div>
             <div class="link">
               <img class="type" alt="Film"><img alt="18+">
               <a target="_blank" href="/out/1"><span class="text">Short</span></a>
               <span class="comment-info"><a href="/kommentarer/1">3</a></span>
             </div>
           </body></html>"#,
    )
    .await;

    mount_solution(
        &server,
        "https://existenz.se/out/1",
        "<script>top.location = 'https://www.youtube.com/shorts/XYZ';</script>",
    )
    .await;

    let summary = scrape(Arc::new(config.clone()), TransportKind::Relay)
        .await
        .unwrap();
    assert_eq!(summary.items, 1);
    assert_eq!(summary.resolved, 1);

    let entries = load_catalog(Path::new(&config.output.catalog_path)).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].date, "Idag");

    let link = &entries[0].links[0];
    assert_eq!(link.title, "Short");
    assert_eq!(link.link_type, LinkType::Youtube);
    assert_eq!(link.src, "XYZ");
    assert!(link.nsfw);
}

#[tokio::test]
async fn test_relay_failure_on_hop_leaves_item_unresolved() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let mut config = Config::for_listing("https://existenz.se/");
    config.transport.relay_endpoint = format!("{}/v1", server.uri());
    config.output.catalog_path = dir.path().join("links.json").display().to_string();

    mount_solution(
        &server,
        "https://existenz.se/",
        r#"<div class="link"><img class="type" alt="Bild">
             <a target="_blank" href="https://existenz.se/out/2"><span class="text">Pic</span></a>
           </div>"#,
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/v1"))
        .and(body_partial_json(json!({ "url": "https://existenz.se/out/2" })))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "message": "Cloudflare challenge failed"
        })))
        .mount(&server)
        .await;

    let summary = scrape(Arc::new(config.clone()), TransportKind::Relay)
        .await
        .unwrap();
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.unresolved, 1);

    let entries = load_catalog(Path::new(&config.output.catalog_path)).unwrap();
    let link = &entries[0].links[0];
    assert_eq!(link.link_type, LinkType::Image);
    assert!(link.src.is_empty());
}
