//! Request handling.
//!
//! # Responsibilities
//! - Capture the immutable part of an inbound request (`RequestHead`)
//! - Derive the percent-decoded servlet path and the request locale
//! - Carry the token cursor and ancestor chain through one dispatch walk
//! - Generate request IDs (UUID v4)
//!
//! # Design Decisions
//! - The head is shared (`Arc`) so nested dispatch and the request-scoped
//!   context see the same request
//! - The walk state (`StaplerRequest`) is owned by exactly one walk
//! - Request ID added as early as possible for tracing

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::request::Parts;
use axum::http::{Method, Request, Uri};
use percent_encoding::percent_decode_str;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::resources::locale::Locale;
use crate::routing::ancestor::Ancestor;
use crate::routing::node::{Node, NodeRef};
use crate::routing::tokens::TokenList;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Produces a fresh UUID v4 for every request lacking an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Immutable view of an inbound request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    context_path: String,
    raw_servlet_path: String,
    servlet_path: String,
    locale: Locale,
    body: Bytes,
}

impl RequestHead {
    /// Build a head from request parts; the servlet path is the URI path
    /// minus `context_path`, percent-decoded.
    ///
    /// Invalid UTF-8 after decoding is replaced with U+FFFD, so such paths
    /// match no graph key or file and resolve to not-found.
    pub fn from_parts(
        parts: Parts,
        body: Bytes,
        context_path: &str,
        default_locale: &Locale,
    ) -> Self {
        let path = parts.uri.path();
        let raw_servlet_path = path.strip_prefix(context_path).unwrap_or(path).to_string();
        let servlet_path = percent_decode_str(&raw_servlet_path)
            .decode_utf8_lossy()
            .into_owned();
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .and_then(Locale::from_accept_language)
            .unwrap_or_else(|| default_locale.clone());

        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            context_path: context_path.to_string(),
            raw_servlet_path,
            servlet_path,
            locale,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Path the application is mounted at (`""` at the server root).
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Request path below the context path, percent-decoded.
    pub fn servlet_path(&self) -> &str {
        &self.servlet_path
    }

    /// Request path below the context path, as the client sent it.
    pub fn raw_servlet_path(&self) -> &str {
        &self.raw_servlet_path
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }
}

/// Walk state of one dispatch: the request head, token cursor and ancestors.
#[derive(Debug)]
pub struct StaplerRequest {
    head: Arc<RequestHead>,
    tokens: TokenList,
    ancestors: Vec<Ancestor>,
}

impl StaplerRequest {
    pub fn new(head: Arc<RequestHead>, tokens: TokenList) -> Self {
        Self {
            head,
            tokens,
            ancestors: Vec::new(),
        }
    }

    pub fn head(&self) -> &Arc<RequestHead> {
        &self.head
    }

    pub fn method(&self) -> &Method {
        self.head.method()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    pub fn servlet_path(&self) -> &str {
        self.head.servlet_path()
    }

    pub fn raw_servlet_path(&self) -> &str {
        self.head.raw_servlet_path()
    }

    pub fn context_path(&self) -> &str {
        self.head.context_path()
    }

    pub fn locale(&self) -> &Locale {
        self.head.locale()
    }

    pub fn tokens(&self) -> &TokenList {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut TokenList {
        &mut self.tokens
    }

    /// Nodes the walk settled on so far, root first.
    pub fn ancestors(&self) -> &[Ancestor] {
        &self.ancestors
    }

    pub(crate) fn record_ancestor(&mut self, node: NodeRef) {
        let ancestor = Ancestor::new(node, self.ancestors.len(), self);
        self.ancestors.push(ancestor);
    }

    /// Closest ancestor whose node is a `T`.
    pub fn find_ancestor<T: Node>(&self) -> Option<&Ancestor> {
        self.ancestors
            .iter()
            .rev()
            .find(|a| a.node().downcast_ref::<T>().is_some())
    }

    /// Closest ancestor node of type `T`.
    pub fn find_ancestor_object<T: Node>(&self) -> Option<&T> {
        self.find_ancestor::<T>()
            .and_then(|a| a.node().downcast_ref::<T>())
    }
}
