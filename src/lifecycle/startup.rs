//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated configuration into a `Stapler` engine
//! - Open the web root
//! - Bind the listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{validate_config, ConfigError, StaplerConfig};
use crate::resources::store::WebRoot;
use crate::routing::engine::{Stapler, StaplerSettings};

/// Fatal error while starting up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid web root {path}: {source}")]
    WebRoot {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
}

/// Validate `config` and build the engine over its web root.
pub fn build_stapler(config: &StaplerConfig) -> Result<Stapler, StartupError> {
    validate_config(config).map_err(ConfigError::Validation)?;
    let settings = StaplerSettings::from_config(config)?;

    let webroot = WebRoot::new(&config.webapp.root).map_err(|source| StartupError::WebRoot {
        path: config.webapp.root.clone(),
        source,
    })?;
    if !webroot.root().is_dir() {
        tracing::warn!(
            root = %webroot.root().display(),
            "Web root is not a directory, no static resources will be found"
        );
    }

    tracing::info!(
        root = %webroot.root().display(),
        context_path = %settings.context_path,
        default_locale = %settings.default_locale,
        no_cache = settings.no_cache,
        "Engine configured"
    );
    Ok(Stapler::new(Arc::new(webroot), settings))
}

/// Bind the configured listener address.
pub async fn bind_listener(config: &StaplerConfig) -> Result<TcpListener, StartupError> {
    let address = &config.listener.bind_address;
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })
}
