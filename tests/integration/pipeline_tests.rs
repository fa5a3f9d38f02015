//! Integration tests for the scrape pipeline
//!
//! These tests use wiremock to serve a listing page and its redirect pages and run the
//! full scrape and comment refresh cycles end-to-end with the direct transport.

use linkcrawl::config::{Config, CookieEntry, TransportKind};
use linkcrawl::crawler::{refresh_comments, scrape};
use linkcrawl::output::load_catalog;
use linkcrawl::transport::build_transport;
use linkcrawl::{CatalogEntry, LinkError, LinkType};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a direct-transport configuration scraping the mock server's root page
fn create_test_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::for_listing(format!("{}/", server.uri()));
    config.transport.kind = TransportKind::Direct;
    config.transport.request_timeout_secs = 5;
    config.output.catalog_path = dir.path().join("links.json").display().to_string();
    config.classifier.relay_domains = vec!["/relay-frame/".to_string()];
    config
}

fn item(icon: &str, href: &str, title: &str, comments: &str) -> String {
    format!(
        r#"<div class="link">
             <img class="type" alt="{icon}">
             <a target="_blank" href="{href}"><span class="text">{title}</span></a>
             <span class="comment-info"><a href="/kommentarer{href}">{comments}</a></span>
           </div>"#
    )
}

fn date(label: &str) -> String {
    format!(r#"<div class="comment-date">{label}</div>"#)
}

fn page(parts: &[String]) -> String {
    format!("<html><body>{}</body></html>", parts.concat())
}

fn html(body: impl Into<Vec<u8>>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn catalog(config: &Config) -> Vec<CatalogEntry> {
    load_catalog(Path::new(&config.output.catalog_path)).expect("catalog should be readable")
}

#[tokio::test]
async fn test_full_scrape() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir);

    mount_page(
        &server,
        "/",
        page(&[
            date("2024-01-01"),
            item("Film", "/out/1", "Clip", "4"),
            item("Bild", "/out/2", "Picture", "0"),
            date("2024-01-02"),
            item("Hemsida", "/out/3", "Site", "2"),
            item("Film", "/out/1", "Clip again", "4"),
            item("Ljud", "/out/4", "Sound", "1"),
        ]),
    )
    .await;

    // The repeated item is listed twice but fetched once
    Mock::given(method("GET"))
        .and(path("/out/1"))
        .respond_with(html(
            "<html><script>var player = new YT.Player('p', { videoId: 'abc123', });</script></html>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/out/2",
        "<script>function countdown() { top.location.href = \
         'https://existenz.se/amedia/?typ=bild&url=https://cdn.example.com/x.jpg'; }</script>"
            .to_string(),
    )
    .await;

    mount_page(
        &server,
        "/out/3",
        "<script>top.location = 'https://example.org/landing';</script>".to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/out/4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let summary = scrape(Arc::new(config.clone()), TransportKind::Direct)
        .await
        .expect("scrape should succeed");

    assert_eq!(summary.items, 5);
    assert_eq!(summary.resolved, 3);
    assert_eq!(summary.unresolved, 2);
    assert_eq!(summary.fetches, 4);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.groups, 2);

    let entries = catalog(&config);
    let dates: Vec<&str> = entries.iter().map(|e| e.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-01-02", "2024-01-01"]);

    let newest = &entries[0].links;
    assert_eq!(newest.len(), 3);
    assert_eq!(newest[0].title, "Site");
    assert_eq!(newest[0].link_type, LinkType::Redirect);
    assert_eq!(newest[0].src, "https://example.org/landing");
    assert_eq!(newest[1].title, "Clip again");
    assert_eq!(newest[1].link_type, LinkType::Video);
    assert!(newest[1].src.is_empty());
    assert_eq!(newest[2].title, "Sound");
    assert_eq!(newest[2].link_type, LinkType::Audio);
    assert!(newest[2].src.is_empty());

    let oldest = &entries[1].links;
    assert_eq!(oldest[0].title, "Clip");
    assert_eq!(oldest[0].link_type, LinkType::Youtube);
    assert_eq!(oldest[0].src, "abc123");
    assert_eq!(oldest[0].comment_url, "/kommentarer/out/1");
    assert_eq!(oldest[0].comment_number, "4");
    assert_eq!(oldest[1].link_type, LinkType::Image);
    assert_eq!(oldest[1].src, "https://cdn.example.com/x.jpg");
}

#[tokio::test]
async fn test_relay_frame_is_followed_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir);

    mount_page(
        &server,
        "/",
        page(&[
            item("Film", "/out/1", "First", "0"),
            item("Film", "/out/2", "Second", "0"),
        ]),
    )
    .await;

    let frame = r#"<iframe src="/relay-frame/9"></iframe>"#.to_string();
    mount_page(&server, "/out/1", frame.clone()).await;
    mount_page(&server, "/out/2", frame).await;

    Mock::given(method("GET"))
        .and(path("/relay-frame/9"))
        .respond_with(html(
            r#"<iframe src="https://player.vimeo.com/video/42"></iframe>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let summary = scrape(Arc::new(config.clone()), TransportKind::Direct)
        .await
        .unwrap();
    assert_eq!(summary.items, 2);
    assert_eq!(summary.resolved, 1);
    assert_eq!(summary.fetches, 3);

    let links = &catalog(&config)[0].links;
    let resolved: Vec<_> = links.iter().filter(|l| !l.src.is_empty()).collect();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].link_type, LinkType::Video);
    assert_eq!(resolved[0].src, "https://player.vimeo.com/video/42");
}

#[tokio::test]
async fn test_depth_limit() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir);
    config.scraper.max_depth = 1;

    mount_page(&server, "/", page(&[item("Spel", "/out/1", "Game", "0")])).await;
    mount_page(
        &server,
        "/out/1",
        r#"<iframe src="/relay-frame/1"></iframe>"#.to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/relay-frame/1"))
        .respond_with(html("<script>videoId: 'never'</script>"))
        .expect(0)
        .mount(&server)
        .await;

    let summary = scrape(Arc::new(config.clone()), TransportKind::Direct)
        .await
        .unwrap();
    assert_eq!(summary.resolved, 0);

    let link = &catalog(&config)[0].links[0];
    assert_eq!(link.link_type, LinkType::Game);
    assert!(link.src.is_empty());
}

#[tokio::test]
async fn test_item_limit() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir);
    config.scraper.max_links = 3;

    let items: Vec<String> = (0..20)
        .map(|i| item("Film", &format!("/out/{}", i), &format!("Item {}", i), "0"))
        .collect();
    mount_page(&server, "/", page(&items)).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/out/\d+$"))
        .respond_with(html("<script>videoId: 'v'</script>"))
        .expect(3)
        .mount(&server)
        .await;

    let summary = scrape(Arc::new(config.clone()), TransportKind::Direct)
        .await
        .unwrap();
    assert_eq!(summary.items, 3);

    let titles: Vec<String> = catalog(&config)[0]
        .links
        .iter()
        .map(|l| l.title.clone())
        .collect();
    assert_eq!(titles, vec!["Item 0", "Item 1", "Item 2"]);
}

#[tokio::test]
async fn test_session_cookie_sent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir);
    config.cookies = vec![CookieEntry {
        name: "PHPSESSID".to_string(),
        value: "abc".to_string(),
        domain: "127.0.0.1".to_string(),
    }];

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("cookie", "PHPSESSID=abc"))
        .respond_with(html(page(&[])))
        .expect(1)
        .mount(&server)
        .await;

    scrape(Arc::new(config), TransportKind::Direct)
        .await
        .expect("listing request should carry the session cookie");
}

#[tokio::test]
async fn test_listing_failure_keeps_previous_catalog() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir);

    let previous = "[\n  {\n    \"date\": \"Idag\",\n    \"links\": []\n  }\n]\n";
    std::fs::write(&config.output.catalog_path, previous).unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = scrape(Arc::new(config.clone()), TransportKind::Direct).await;
    assert!(matches!(result, Err(LinkError::Listing { .. })));
    assert_eq!(
        std::fs::read_to_string(&config.output.catalog_path).unwrap(),
        previous
    );
}

#[tokio::test]
async fn test_comment_refresh() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir);

    std::fs::write(
        &config.output.catalog_path,
        r#"[{"date": "Idag", "links": [
            {"title": "Clip", "icon": "Film", "type": "youtube", "src": "abc123",
             "comment_url": "/kommentarer/out/1", "comment_number": "4", "nsfw": false},
            {"title": "Old", "icon": "Bild", "type": "image", "src": "https://cdn.example.com/x.jpg",
             "comment_url": "/kommentarer/out/gone", "comment_number": "9", "nsfw": true}
        ]}]"#,
    )
    .unwrap();

    mount_page(
        &server,
        "/",
        page(&[
            item("Film", "/out/1", "Clip", "42"),
            item("Film", "/out/7", "New item", "1"),
        ]),
    )
    .await;

    let transport = build_transport(&config, TransportKind::Direct).unwrap();
    let listing_url = url::Url::parse(&config.scraper.listing_url).unwrap();
    let report = refresh_comments(
        Path::new(&config.output.catalog_path),
        &listing_url,
        transport.as_ref(),
    )
    .await
    .unwrap();

    assert_eq!(report.links, 2);
    assert_eq!(report.matched, 1);
    assert_eq!(report.changed, 1);

    let entries = catalog(&config);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].links.len(), 2);
    assert_eq!(entries[0].links[0].comment_number, "42");
    assert_eq!(entries[0].links[0].src, "abc123");
    assert_eq!(entries[0].links[1].comment_number, "9");
    assert!(entries[0].links[1].nsfw);
}

#[tokio::test]
async fn test_comment_refresh_failure_leaves_catalog() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir);

    let previous = r#"[{"date":"Idag","links":[]}]"#;
    std::fs::write(&config.output.catalog_path, previous).unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let transport = build_transport(&config, TransportKind::Direct).unwrap();
    let report = linkcrawl::crawler::run_comment_refresh(&config, transport.as_ref()).await;

    assert!(report.is_none());
    assert_eq!(
        std::fs::read_to_string(&config.output.catalog_path).unwrap(),
        previous
    );
}
