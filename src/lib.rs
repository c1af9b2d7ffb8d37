//! Object graph dispatcher and static resource server.
//!
//! A request path is resolved against a live object graph: starting at the
//! registered root, each path segment is consumed by a strategy registered
//! for the current node's type, until a node writes the response. Paths that
//! name a file under the web root are served directly, localized by the
//! request's `Accept-Language` and with conditional-GET support.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resources;
pub mod routing;

pub use config::schema::StaplerConfig;
pub use error::StaplerError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::engine::{Stapler, StaplerSettings};
