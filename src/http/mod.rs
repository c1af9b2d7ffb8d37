//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout, request ID, body limit)
//!     → request.rs (RequestHead: servlet path, locale)
//!     → [blocking worker] Stapler::service
//!         → current.rs (request/response bound to the worker thread)
//!         → response.rs (status, headers, plain or gzip body)
//!     → Send to client
//! ```

pub mod current;
pub mod request;
pub mod response;
pub mod server;

pub use current::{current_request, current_response, RequestScope};
pub use request::{RequestHead, StaplerRequest, UuidRequestId, X_REQUEST_ID};
pub use response::StaplerResponse;
pub use server::HttpServer;
