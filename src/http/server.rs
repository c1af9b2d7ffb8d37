//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all dispatch handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Buffer request bodies up to the configured limit
//! - Run the synchronous dispatch walk on a blocking worker
//! - Bind server to listener and shut down gracefully
//! - Observability (metrics, correlation IDs)

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::StaplerConfig;
use crate::error::StaplerError;
use crate::http::request::UuidRequestId;
use crate::observability::metrics;
use crate::routing::engine::Stapler;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub stapler: Arc<Stapler>,
    pub max_body_bytes: usize,
}

/// HTTP server fronting a `Stapler` engine.
pub struct HttpServer {
    router: Router,
    config: StaplerConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: StaplerConfig, stapler: Arc<Stapler>) -> Self {
        let state = AppState {
            stapler,
            max_body_bytes: config.limits.max_body_bytes,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &StaplerConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(stapler_handler))
            .route("/", any(stapler_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The configured router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &StaplerConfig {
        &self.config
    }
}

/// Catch-all handler: buffers the body and hands the request to the engine.
async fn stapler_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();
    let request_id = parts
        .headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request body rejected");
            metrics::record_request(&method, StatusCode::PAYLOAD_TOO_LARGE.as_u16(), start_time);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let head = Arc::new(state.stapler.request_head(parts, body));
    let stapler = Arc::clone(&state.stapler);
    let outcome = tokio::task::spawn_blocking(move || stapler.service(head)).await;

    let response = match outcome {
        Ok(Ok(rsp)) => rsp.into_response(),
        Ok(Err(e)) => {
            log_failure(&request_id, &e);
            e.into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Dispatch worker failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    };

    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}

fn log_failure(request_id: &str, error: &StaplerError) {
    match error {
        StaplerError::Application { status, .. } => {
            tracing::info!(
                request_id = %request_id,
                status = %status,
                error = %error,
                "Application failure"
            );
        }
        StaplerError::MissingRoot => {
            tracing::error!(request_id = %request_id, "No root object registered");
        }
        other => {
            tracing::error!(request_id = %request_id, error = %other, "Request failed");
        }
    }
}
