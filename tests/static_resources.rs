//! End-to-end tests of static resource serving.

use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use flate2::read::GzDecoder;

use stapler::config::StaplerConfig;
use stapler::lifecycle::Shutdown;
use stapler::routing::{Node, NodeRef};
use stapler::{HttpServer, StaplerSettings};

mod common;

struct Empty;
impl Node for Empty {}

fn get_with(path: &str, headers: &[(header::HeaderName, &str)]) -> Request<Body> {
    let mut builder = Request::get(path);
    for (name, value) in headers {
        builder = builder.header(name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_static_link_serves_best_locale_variant() {
    let dir = common::webroot(&[
        ("style.css", b"body { color: black }"),
        ("style_fr.css", b"body { color: bleu }"),
    ]);
    let app = common::app(Arc::new(common::stapler(&dir)));

    let request = get_with("/static/v1/style.css", &[(header::ACCEPT_LANGUAGE, "fr-CA")]);
    let rsp = common::send(&app, request).await;

    assert_eq!(rsp.status, StatusCode::OK);
    assert_eq!(rsp.text(), "body { color: bleu }");
    assert!(rsp.header("content-type").unwrap().starts_with("text/css"));
    assert!(rsp.header("last-modified").is_some());

    let expires = httpdate::parse_http_date(rsp.header("expires").unwrap()).unwrap();
    assert!(expires > SystemTime::now() + Duration::from_secs(300 * 24 * 3600));
}

#[tokio::test]
async fn test_plain_path_expires_in_a_day() {
    let dir = common::webroot(&[("style.css", b"body {}")]);
    let app = common::app(Arc::new(common::stapler(&dir)));

    let rsp = common::get(&app, "/style.css").await;
    assert_eq!(rsp.text(), "body {}");
    let expires = httpdate::parse_http_date(rsp.header("expires").unwrap()).unwrap();
    assert!(expires > SystemTime::now() + Duration::from_secs(23 * 3600));
    assert!(expires < SystemTime::now() + Duration::from_secs(25 * 3600));
}

#[tokio::test]
async fn test_no_cache_expires_immediately() {
    let dir = common::webroot(&[("style.css", b"body {}")]);
    let settings = StaplerSettings {
        no_cache: true,
        ..StaplerSettings::default()
    };
    let app = common::app(Arc::new(common::stapler_with(&dir, settings)));

    let rsp = common::get(&app, "/static/v1/style.css").await;
    assert_eq!(rsp.header("expires"), rsp.header("last-modified"));
}

#[tokio::test]
async fn test_unlocalized_file_falls_back_to_base_name() {
    let dir = common::webroot(&[("app.js", b"var a;"), ("README", b"readme")]);
    let app = common::app(Arc::new(common::stapler(&dir)));

    let request = get_with("/app.js", &[(header::ACCEPT_LANGUAGE, "ja-JP")]);
    assert_eq!(common::send(&app, request).await.text(), "var a;");

    let request = get_with("/README", &[(header::ACCEPT_LANGUAGE, "ja-JP")]);
    assert_eq!(common::send(&app, request).await.text(), "readme");
}

#[tokio::test]
async fn test_encoded_file_names_are_served() {
    let dir = common::webroot(&[
        ("my file.css", b"body { padding: 0 }"),
        ("café.txt", b"menu"),
    ]);
    let app = common::app(Arc::new(common::stapler(&dir)));

    let rsp = common::get(&app, "/my%20file.css").await;
    assert_eq!(rsp.status, StatusCode::OK);
    assert_eq!(rsp.text(), "body { padding: 0 }");

    let rsp = common::get(&app, "/static/v1/caf%C3%A9.txt").await;
    assert_eq!(rsp.status, StatusCode::OK);
    assert_eq!(rsp.text(), "menu");
}

#[tokio::test]
async fn test_conditional_get_not_modified() {
    let dir = common::webroot(&[("logo.png", &[0x89, b'P', b'N', b'G'])]);
    let app = common::app(Arc::new(common::stapler(&dir)));

    let first = common::get(&app, "/logo.png").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.header("content-type"), Some("image/png"));
    assert_eq!(first.header("content-length"), Some("4"));
    let last_modified = first.header("last-modified").unwrap().to_string();

    let request = get_with("/logo.png", &[(header::IF_MODIFIED_SINCE, &last_modified)]);
    let second = common::send(&app, request).await;
    assert_eq!(second.status, StatusCode::NOT_MODIFIED);
    assert!(second.body.is_empty());

    let stale = httpdate::fmt_http_date(
        httpdate::parse_http_date(&last_modified).unwrap() - Duration::from_secs(2),
    );
    let request = get_with("/logo.png", &[(header::IF_MODIFIED_SINCE, &stale)]);
    let third = common::send(&app, request).await;
    assert_eq!(third.status, StatusCode::OK);
    assert_eq!(third.body.len(), 4);
}

#[tokio::test]
async fn test_text_is_gzipped_when_accepted() {
    let css = "body { margin: 0 }\n".repeat(50);
    let dir = common::webroot(&[("site.css", css.as_bytes())]);
    let app = common::app(Arc::new(common::stapler(&dir)));

    let request = get_with("/site.css", &[(header::ACCEPT_ENCODING, "gzip, br")]);
    let rsp = common::send(&app, request).await;
    assert_eq!(rsp.header("content-encoding"), Some("gzip"));
    assert!(rsp.header("content-length").map_or(true, |len| len != css.len().to_string()));

    let mut decoded = String::new();
    GzDecoder::new(&rsp.body[..]).read_to_string(&mut decoded).unwrap();
    assert_eq!(decoded, css);
}

#[tokio::test]
async fn test_directory_is_not_served() {
    let dir = common::webroot(&[("docs/guide.txt", b"guide")]);
    let stapler = common::stapler(&dir);
    stapler.set_root(Arc::new(Empty) as NodeRef);
    let app = common::app(Arc::new(stapler));

    assert_eq!(common::get(&app, "/docs").await.status, StatusCode::NOT_FOUND);
    assert_eq!(common::get(&app, "/docs/").await.status, StatusCode::NOT_FOUND);
    assert_eq!(common::get(&app, "/docs/guide.txt").await.text(), "guide");
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let dir = common::webroot(&[]);
    let mut config = StaplerConfig::default();
    config.limits.max_body_bytes = 8;
    let app = common::app_with(config, Arc::new(common::stapler(&dir)));

    let request = Request::post("/upload")
        .body(Body::from(vec![0u8; 64]))
        .unwrap();
    let rsp = common::send(&app, request).await;
    assert_eq!(rsp.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_live_server_round_trip() {
    let dir = common::webroot(&[("hello.txt", b"hello over tcp")]);
    let server = HttpServer::new(StaplerConfig::default(), Arc::new(common::stapler(&dir)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let response = reqwest::get(format!("http://{addr}/hello.txt")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = response.bytes().await.unwrap();
    assert_eq!(&body[..], b"hello over tcp");

    shutdown.trigger();
    handle.await.unwrap().unwrap();
}
