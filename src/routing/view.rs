//! Collaborators consulted when a path is fully consumed.
//!
//! Rendering is outside this crate. A view technology renders a node's index
//! view, a forwarder hands a welcome resource to whatever renders it. Both
//! report whether they produced a response.

use std::fmt;

use thiserror::Error;

use crate::error::StaplerError;
use crate::http::request::StaplerRequest;
use crate::http::response::StaplerResponse;
use crate::resources::store::OpenResource;
use crate::routing::node::{Klass, NodeRef};

/// Failure of a view technology.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The technology is not present at runtime; the engine skips it.
    #[error("view technology unavailable: {0}")]
    Unavailable(String),

    /// Rendering failed; the walk halts with this error.
    #[error(transparent)]
    Failed(#[from] StaplerError),
}

/// A view technology able to render a node's index view.
pub trait ViewTechnology: Send + Sync {
    fn name(&self) -> &str;

    /// Render the index view of `node`, whose runtime type is `klass`.
    /// Returns `Ok(false)` when the type has no index view.
    fn serve_index(
        &self,
        req: &mut StaplerRequest,
        rsp: &StaplerResponse,
        node: &NodeRef,
        klass: Klass,
    ) -> Result<bool, ViewError>;
}

impl fmt::Debug for dyn ViewTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewTechnology({})", self.name())
    }
}

/// Hands a welcome resource found under a node's side-file directory to the
/// hosting environment's renderer.
pub trait ResourceForwarder: Send + Sync {
    /// Returns `Ok(false)` when the resource could not be rendered.
    fn forward(
        &self,
        resource: OpenResource,
        req: &mut StaplerRequest,
        rsp: &StaplerResponse,
        node: &NodeRef,
    ) -> Result<bool, StaplerError>;
}
