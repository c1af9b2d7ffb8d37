//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use stapler::config::StaplerConfig;
use stapler::http::HttpServer;
use stapler::resources::WebRoot;
use stapler::{Stapler, StaplerSettings};

/// Create a temporary web root holding `files` (paths relative to the root).
pub fn webroot(files: &[(&str, &[u8])]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, body) in files {
        write_file(dir.path(), path, body);
    }
    dir
}

/// Write `body` at `path` below `root`, creating parent directories.
pub fn write_file(root: &Path, path: &str, body: &[u8]) {
    let target = root.join(path.trim_start_matches('/'));
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(target, body).unwrap();
}

/// Engine over `dir` with default settings.
pub fn stapler(dir: &TempDir) -> Stapler {
    stapler_with(dir, StaplerSettings::default())
}

pub fn stapler_with(dir: &TempDir, settings: StaplerSettings) -> Stapler {
    let root = WebRoot::new(dir.path()).unwrap();
    Stapler::new(Arc::new(root), settings)
}

/// Router with the full middleware stack in front of `stapler`.
pub fn app(stapler: Arc<Stapler>) -> Router {
    HttpServer::new(StaplerConfig::default(), stapler).router()
}

pub fn app_with(config: StaplerConfig, stapler: Arc<Stapler>) -> Router {
    HttpServer::new(config, stapler).router()
}

/// Buffered response of an in-process request.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Send `request` through `router` in-process.
pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

/// `GET path` through `router`.
pub async fn get(router: &Router, path: &str) -> TestResponse {
    send(router, Request::get(path).body(Body::empty()).unwrap()).await
}
