//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StaplerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Web application layout and routing settings.
    pub webapp: WebAppConfig,

    /// Static resource serving.
    pub static_resources: StaticResourcesConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Web application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebAppConfig {
    /// Directory holding static resources and side-files.
    pub root: String,

    /// Path prefix the application is mounted at (e.g., "/app"), empty for "/".
    pub context_path: String,

    /// Locale used when `Accept-Language` is absent or unusable.
    pub default_locale: String,

    /// Side-file handed to the welcome forwarder for fully consumed paths.
    pub welcome_file: String,

    /// Side-file served as a node's static index page.
    pub index_file: String,
}

impl Default for WebAppConfig {
    fn default() -> Self {
        Self {
            root: "./webapp".to_string(),
            context_path: String::new(),
            default_locale: "en".to_string(),
            welcome_file: "index.view".to_string(),
            index_file: "index.html".to_string(),
        }
    }
}

/// Static resource configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticResourcesConfig {
    /// Charset per MIME type, as `type=charset;type=charset`.
    pub default_encodings: Option<String>,

    /// Serve every static resource as already expired.
    pub no_cache: bool,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: StaplerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.webapp.default_locale, "en");
        assert_eq!(config.webapp.index_file, "index.html");
        assert_eq!(config.timeouts.request_secs, 30);
        assert!(!config.static_resources.no_cache);
    }

    #[test]
    fn test_partial_sections() {
        let config: StaplerConfig = toml::from_str(
            r#"
            [webapp]
            root = "/srv/app"
            context_path = "/app"

            [static_resources]
            default_encodings = "text/html=UTF-8"
            no_cache = true

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.webapp.root, "/srv/app");
        assert_eq!(config.webapp.context_path, "/app");
        assert_eq!(config.webapp.welcome_file, "index.view");
        assert_eq!(
            config.static_resources.default_encodings.as_deref(),
            Some("text/html=UTF-8")
        );
        assert!(config.static_resources.no_cache);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
    }
}
