//! Errors raised while serving a request.
//!
//! Not-found and redirects are responses, not errors. What remains here are
//! failures the hosting layer must turn into an error response.

use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Failure of a dispatch walk or of the request entry point.
#[derive(Debug, Error)]
pub enum StaplerError {
    /// No root object has been registered.
    #[error("there is no root object registered for this application")]
    MissingRoot,

    /// A dispatch strategy failed unexpectedly.
    #[error("error while serving {url}")]
    Access {
        /// Request URL being served.
        url: String,
        #[source]
        source: BoxError,
    },

    /// Failure raised deliberately by application code.
    #[error("{source}")]
    Application { status: StatusCode, source: BoxError },

    /// A view technology failed while rendering.
    #[error("{technology} view failed: {message}")]
    View { technology: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StaplerError {
    /// Unexpected strategy failure while serving `url`.
    pub fn access(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Access {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Application failure reported as `500 Internal Server Error`.
    pub fn application(source: impl Into<BoxError>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, source)
    }

    /// Application failure reported with `status`.
    pub fn with_status(status: StatusCode, source: impl Into<BoxError>) -> Self {
        Self::Application {
            status,
            source: source.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            StaplerError::Application { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StaplerError {
    fn into_response(self) -> Response {
        let body = match &self {
            StaplerError::Application { source, .. } => source.to_string(),
            StaplerError::Access { source, .. } => format!("{self}: {source}"),
            other => other.to_string(),
        };
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_error_keeps_status_and_message() {
        let err = StaplerError::with_status(StatusCode::CONFLICT, "item is locked");
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "item is locked");
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_access_error_preserves_cause() {
        let err = StaplerError::access("/items/1", "getter panicked");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("getter panicked"));
    }

    #[test]
    fn test_missing_root_is_server_error() {
        let response = StaplerError::MissingRoot.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
