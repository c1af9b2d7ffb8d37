//! Stapler server (v1)
//!
//! Serves a web root with HTTP caching semantics and resolves every other
//! request against an application object graph.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (timeout, request ID, body limit)
//!                          │
//!                          ▼  spawn_blocking
//!                     routing::engine::Stapler::service
//!                          │
//!            ┌─────────────┴──────────────┐
//!            ▼                            ▼
//!     resources (static)            object graph walk
//!     locator → serve               proxy → ancestor → fallbacks
//!                                   → metaclass strategies
//!            │                            │
//!            └─────────────┬──────────────┘
//!                          ▼
//!     Client Response ◀── StaplerResponse
//! ```
//!
//! The binary has no application object graph of its own: applications
//! embed the library, call `Stapler::set_root` and register strategies.
//! Run standalone, it serves the web root and answers other paths with
//! a server error until a root is registered.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use stapler::config::{load_config, validate_config, ConfigError, StaplerConfig};
use stapler::http::HttpServer;
use stapler::lifecycle::{bind_listener, build_stapler, signals, Shutdown};
use stapler::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "stapler")]
#[command(about = "Object graph dispatcher and static resource server", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Web root directory, overrides `webapp.root`.
    #[arg(short, long)]
    webroot: Option<String>,

    /// Charsets per MIME type as `type=charset;...`, overrides
    /// `static_resources.default_encodings`.
    #[arg(long)]
    default_encodings: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<StaplerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => StaplerConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(webroot) = self.webroot {
            config.webapp.root = webroot;
        }
        if let Some(encodings) = self.default_encodings {
            config.static_resources.default_encodings = Some(encodings);
        }
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "stapler starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        webroot = %config.webapp.root,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let stapler = Arc::new(build_stapler(&config)?);
    if stapler.root().is_none() {
        tracing::warn!("No root object registered, only static resources will be served");
    }

    let listener = bind_listener(&config).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(config, stapler);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::shutdown_on_signal(&shutdown).await;
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
