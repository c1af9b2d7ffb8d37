//! Static resource subsystem.
//!
//! # Data Flow
//! ```text
//! Logical path + request locale
//!     → store.rs (ResourceStore resolves path to URL)
//!     → locale.rs (localized candidate URLs, most specific first)
//!     → locator.rs (open candidates until one yields a stream)
//!     → OpenResource (connection metadata + open stream)
//!     → serve.rs (conditional GET, caching headers, copy to response)
//! ```
//!
//! # Design Decisions
//! - Opening is the existence check; the opened stream is what gets served
//! - Handles own their stream and close it on drop

pub mod locale;
pub mod locator;
pub mod serve;
pub mod store;

pub use locale::Locale;
pub use locator::ResourceLocator;
pub use serve::StaticServer;
pub use store::{Connection, OpenResource, ResourceStore, WebRoot};
