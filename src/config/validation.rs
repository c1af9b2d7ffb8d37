//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Parse the default-encodings table
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: StaplerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashMap;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::StaplerConfig;
use crate::resources::locale::Locale;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate `config`, collecting every error.
pub fn validate_config(config: &StaplerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {:?}", config.listener.bind_address),
        ));
    }

    let context_path = &config.webapp.context_path;
    if !context_path.is_empty() && (!context_path.starts_with('/') || context_path.ends_with('/')) {
        errors.push(ValidationError::new(
            "webapp.context_path",
            "must be empty or start with '/' and not end with '/'",
        ));
    }

    if config.webapp.default_locale.parse::<Locale>().is_err() {
        errors.push(ValidationError::new(
            "webapp.default_locale",
            format!("not a locale tag: {:?}", config.webapp.default_locale),
        ));
    }

    for (field, name) in [
        ("webapp.welcome_file", &config.webapp.welcome_file),
        ("webapp.index_file", &config.webapp.index_file),
    ] {
        if name.is_empty() || name.contains('/') {
            errors.push(ValidationError::new(field, "must be a plain file name"));
        }
    }

    if let Some(encodings) = &config.static_resources.default_encodings {
        if let Err(e) = parse_default_encodings(encodings) {
            errors.push(e);
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {:?}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a `type=charset;type=charset` table.
///
/// Entries are trimmed and empty entries skipped; an entry without `=` or
/// with an empty side is rejected.
pub fn parse_default_encodings(table: &str) -> Result<HashMap<String, String>, ValidationError> {
    let mut encodings = HashMap::new();
    for entry in table.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((mime_type, charset)) = entry.split_once('=') else {
            return Err(ValidationError::new(
                "static_resources.default_encodings",
                format!("invalid format: {entry}"),
            ));
        };
        let (mime_type, charset) = (mime_type.trim(), charset.trim());
        if mime_type.is_empty() || charset.is_empty() {
            return Err(ValidationError::new(
                "static_resources.default_encodings",
                format!("invalid format: {entry}"),
            ));
        }
        encodings.insert(mime_type.to_string(), charset.to_string());
    }
    Ok(encodings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&StaplerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = StaplerConfig::default();
        config.listener.bind_address = "nowhere".to_string();
        config.webapp.context_path = "app/".to_string();
        config.static_resources.default_encodings = Some("text/html".to_string());
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "webapp.context_path",
                "static_resources.default_encodings",
                "timeouts.request_secs",
            ]
        );
    }

    #[test]
    fn test_parse_default_encodings() {
        let encodings = parse_default_encodings(" text/html=UTF-8 ; text/css=ISO-8859-1;").unwrap();
        assert_eq!(encodings.len(), 2);
        assert_eq!(encodings["text/html"], "UTF-8");
        assert_eq!(encodings["text/css"], "ISO-8859-1");
    }

    #[test]
    fn test_malformed_encoding_entries() {
        assert!(parse_default_encodings("text/html").is_err());
        assert!(parse_default_encodings("=UTF-8").is_err());
        assert!(parse_default_encodings("text/html=").is_err());
        assert!(parse_default_encodings("").unwrap().is_empty());
    }
}
