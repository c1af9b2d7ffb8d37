//! Ancestor records of a dispatch walk.
//!
//! Every node the walk settles on is recorded together with the cursor
//! position at that moment, which is enough to rebuild the URL of any
//! object along the path.

use std::fmt;

use crate::http::request::StaplerRequest;
use crate::routing::node::NodeRef;

/// One node the walk settled on, with a snapshot of the request state.
#[derive(Clone)]
pub struct Ancestor {
    node: NodeRef,
    index: usize,
    token_index: usize,
    url: String,
    rest_of_url: String,
}

impl Ancestor {
    pub(crate) fn new(node: NodeRef, index: usize, req: &StaplerRequest) -> Self {
        let tokens = req.tokens();
        Self {
            node,
            index,
            token_index: tokens.index(),
            url: format!("{}{}", req.context_path(), tokens.assemble_consumed_path()),
            rest_of_url: tokens.assemble_rest_of_path(),
        }
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Position in the ancestor chain, root is 0.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of path segments consumed when this node was reached.
    pub fn token_index(&self) -> usize {
        self.token_index
    }

    /// Absolute URL of this node, without a trailing `/`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path segments still unconsumed when this node was reached.
    pub fn rest_of_url(&self) -> &str {
        &self.rest_of_url
    }

    /// `url` expressed relative to the request URL, e.g. `../..`.
    pub fn relative_path(&self, req: &StaplerRequest) -> String {
        let depth = req.tokens().len().saturating_sub(self.token_index);
        if depth == 0 {
            return ".".to_string();
        }
        vec![".."; depth].join("/")
    }
}

impl fmt::Debug for Ancestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ancestor")
            .field("node", &self.node)
            .field("index", &self.index)
            .field("url", &self.url)
            .finish()
    }
}
