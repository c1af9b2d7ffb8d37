//! Dispatch engine and request entry point.
//!
//! # Responsibilities
//! - Serve static resources found directly under the web root
//! - Walk the object graph from the root, one node per step
//! - Unwrap delegation proxies and record every settled node as an ancestor
//! - Apply the fully-consumed-path fallbacks (redirect, delete, welcome
//!   resource, index views, static index side-file)
//! - Consult the node type's strategies in order, first match wins
//!
//! # Design Decisions
//! - The walk is a loop, not recursion: a strategy names the next node and
//!   the engine continues from there
//! - The walk is synchronous; the server runs it on a blocking worker
//! - The root lives in a swappable slot, so it can be replaced at runtime
//! - A missing view technology is logged once and skipped

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::body::Bytes;
use axum::http::request::Parts;
use axum::http::{Method, StatusCode};
use dashmap::DashSet;

use crate::config::{parse_default_encodings, ConfigError, StaplerConfig, ValidationError};
use crate::error::StaplerError;
use crate::http::current::RequestScope;
use crate::http::request::{RequestHead, StaplerRequest};
use crate::http::response::StaplerResponse;
use crate::resources::locale::Locale;
use crate::resources::locator::ResourceLocator;
use crate::resources::serve::StaticServer;
use crate::resources::store::{OpenResource, ResourceStore};
use crate::routing::dispatcher::Dispatched;
use crate::routing::metaclass::{MetaClass, MetaClassRegistry};
use crate::routing::node::{Klass, NodeRef};
use crate::routing::tokens::TokenList;
use crate::routing::view::{ResourceForwarder, ViewError};

/// Root of the per-type side-file namespace.
pub const SIDE_FILES: &str = "/WEB-INF/side-files";

const STATIC_PREFIX: &str = "/static/";

/// How long static resources may be cached: one day.
const DEFAULT_EXPIRATION_MS: i64 = 24 * 60 * 60 * 1000;

/// Versioned `/static/<key>/...` links never change, so they are cached for a year.
const STATIC_LINK_FACTOR: i64 = 365;

/// Path of side-file `name` of type `klass`.
pub fn side_file_path(klass: Klass, name: &str) -> String {
    format!("{SIDE_FILES}/{}/{}", klass.resource_path(), name)
}

/// Result of one step of the walk.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Continue the walk on the given node; `None` resolves to not-found.
    Continue(Option<NodeRef>),
    /// A response has been written.
    Responded,
    /// Nothing handled the request.
    NotFound,
}

/// Engine settings derived from configuration.
#[derive(Debug, Clone)]
pub struct StaplerSettings {
    pub context_path: String,
    pub default_locale: Locale,
    pub welcome_file: String,
    pub index_file: String,
    pub no_cache: bool,
    pub default_encodings: HashMap<String, String>,
}

impl Default for StaplerSettings {
    fn default() -> Self {
        Self {
            context_path: String::new(),
            default_locale: Locale::new("en", "", ""),
            welcome_file: "index.view".to_string(),
            index_file: "index.html".to_string(),
            no_cache: false,
            default_encodings: HashMap::new(),
        }
    }
}

impl StaplerSettings {
    pub fn from_config(config: &StaplerConfig) -> Result<Self, ConfigError> {
        let default_locale = config.webapp.default_locale.parse::<Locale>().map_err(|e| {
            ConfigError::Validation(vec![ValidationError {
                field: "webapp.default_locale".to_string(),
                message: e.to_string(),
            }])
        })?;
        let default_encodings = match &config.static_resources.default_encodings {
            Some(table) => {
                parse_default_encodings(table).map_err(|e| ConfigError::Validation(vec![e]))?
            }
            None => HashMap::new(),
        };
        Ok(Self {
            context_path: config.webapp.context_path.clone(),
            default_locale,
            welcome_file: config.webapp.welcome_file.clone(),
            index_file: config.webapp.index_file.clone(),
            no_cache: config.static_resources.no_cache,
            default_encodings,
        })
    }
}

/// Resolves requests against an object graph and the web root.
pub struct Stapler {
    settings: StaplerSettings,
    locator: ResourceLocator,
    static_server: StaticServer,
    metaclasses: MetaClassRegistry,
    forwarder: Option<Arc<dyn ResourceForwarder>>,
    root: ArcSwapOption<NodeRef>,
    missing_views: DashSet<String>,
}

impl Stapler {
    pub fn new(store: Arc<dyn ResourceStore>, settings: StaplerSettings) -> Self {
        let static_server = StaticServer::new(settings.default_encodings.clone());
        Self {
            settings,
            locator: ResourceLocator::new(store),
            static_server,
            metaclasses: MetaClassRegistry::new(),
            forwarder: None,
            root: ArcSwapOption::empty(),
            missing_views: DashSet::new(),
        }
    }

    /// Install the renderer for welcome resources.
    pub fn with_forwarder(mut self, forwarder: Arc<dyn ResourceForwarder>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    pub fn settings(&self) -> &StaplerSettings {
        &self.settings
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    /// Strategy and view registry consulted during the walk.
    pub fn metaclasses(&self) -> &MetaClassRegistry {
        &self.metaclasses
    }

    /// Register `root` as the object bound to `/`, replacing any previous root.
    pub fn set_root(&self, root: NodeRef) {
        tracing::info!(root = ?root, "Registered application root");
        self.root.store(Some(Arc::new(root)));
    }

    pub fn root(&self) -> Option<NodeRef> {
        self.root.load_full().map(|root| Arc::clone(&*root))
    }

    /// Capture a request head with this engine's context path and default locale.
    pub fn request_head(&self, parts: Parts, body: Bytes) -> RequestHead {
        RequestHead::from_parts(
            parts,
            body,
            &self.settings.context_path,
            &self.settings.default_locale,
        )
    }

    /// Serve one request: static resources first, then the object graph.
    pub fn service(&self, head: Arc<RequestHead>) -> Result<StaplerResponse, StaplerError> {
        let rsp = StaplerResponse::new();
        tracing::debug!(
            request_id = head.request_id().unwrap_or("unknown"),
            method = %head.method(),
            path = head.servlet_path(),
            "Processing request"
        );

        let (path, static_link) = strip_static_prefix(head.servlet_path());

        if !path.is_empty() {
            if let Some(resource) = self.locator.open_path_by_locale(path, head.locale()) {
                let mut expiration = if self.settings.no_cache {
                    0
                } else {
                    DEFAULT_EXPIRATION_MS
                };
                if static_link {
                    expiration *= STATIC_LINK_FACTOR;
                }
                if self
                    .static_server
                    .serve(head.headers(), &rsp, Some(resource), expiration)?
                {
                    return Ok(rsp);
                }
            }
        }

        let root = self.root().ok_or(StaplerError::MissingRoot)?;
        let path = path.to_string();
        self.invoke(head, &rsp, root, &path)?;
        Ok(rsp)
    }

    /// Walk the graph from `root` along `url`, writing into `rsp`.
    ///
    /// `head` and `rsp` are bound as the current request for the duration of
    /// the walk; a nested call restores the enclosing binding on return.
    pub fn invoke(
        &self,
        head: Arc<RequestHead>,
        rsp: &StaplerResponse,
        root: NodeRef,
        url: &str,
    ) -> Result<(), StaplerError> {
        let _scope = RequestScope::enter(Arc::clone(&head), rsp.clone());
        let mut req = StaplerRequest::new(head, TokenList::new(url));
        self.walk(&mut req, rsp, Some(root))
    }

    fn walk(
        &self,
        req: &mut StaplerRequest,
        rsp: &StaplerResponse,
        mut node: Option<NodeRef>,
    ) -> Result<(), StaplerError> {
        loop {
            match self.step(req, rsp, node)? {
                DispatchOutcome::Continue(next) => node = next,
                DispatchOutcome::Responded => return Ok(()),
                DispatchOutcome::NotFound => {
                    tracing::debug!(path = req.servlet_path(), "No handler found");
                    rsp.send_error(StatusCode::NOT_FOUND);
                    return Ok(());
                }
            }
        }
    }

    /// One step of the walk from `node`.
    ///
    /// An absent node, or a proxy that resolves to nothing, is reported as
    /// not-found without being recorded: the ancestor chain only holds nodes
    /// that exist, so its last element is always the node that responded.
    fn step(
        &self,
        req: &mut StaplerRequest,
        rsp: &StaplerResponse,
        node: Option<NodeRef>,
    ) -> Result<DispatchOutcome, StaplerError> {
        let Some(node) = node.and_then(unwrap_proxies) else {
            return Ok(DispatchOutcome::NotFound);
        };
        req.record_ancestor(Arc::clone(&node));

        let metaclass = self.metaclasses.get(node.klass());

        if !req.tokens().has_more() && self.serve_fully_consumed(req, rsp, &node, &metaclass)? {
            return Ok(DispatchOutcome::Responded);
        }

        for dispatcher in metaclass.dispatchers() {
            match dispatcher.dispatch(req, rsp, &node) {
                Ok(Dispatched::Declined) => continue,
                Ok(Dispatched::Handled) => return Ok(DispatchOutcome::Responded),
                Ok(Dispatched::Descend(next)) => return Ok(DispatchOutcome::Continue(next)),
                Err(e) => {
                    if matches!(e, StaplerError::Application { .. }) {
                        tracing::debug!(
                            strategy = %dispatcher.describe(),
                            error = %e,
                            "Application failure"
                        );
                        return Err(e);
                    }
                    tracing::error!(
                        strategy = %dispatcher.describe(),
                        url = %request_url(req),
                        error = %e,
                        "Error while serving"
                    );
                    return Err(match e {
                        StaplerError::Io(source) => StaplerError::access(request_url(req), source),
                        other => other,
                    });
                }
            }
        }

        Ok(DispatchOutcome::NotFound)
    }

    /// Fallbacks for a node whose path is fully consumed. Returns whether a
    /// response was written.
    fn serve_fully_consumed(
        &self,
        req: &mut StaplerRequest,
        rsp: &StaplerResponse,
        node: &NodeRef,
        metaclass: &MetaClass,
    ) -> Result<bool, StaplerError> {
        if !req.servlet_path().ends_with('/') {
            let target = format!("{}{}/", req.context_path(), req.raw_servlet_path());
            tracing::debug!(location = %target, "Redirecting to directory URL");
            rsp.send_redirect(&target);
            return Ok(true);
        }

        if *req.method() == Method::DELETE {
            if let Some(deletable) = node.as_deletable() {
                tracing::debug!(node = ?node, "Deleting");
                deletable.delete(req, rsp)?;
                return Ok(true);
            }
        }

        if let Some(forwarder) = &self.forwarder {
            let welcome = self.open_side_file(metaclass.klass(), &self.settings.welcome_file);
            if let Some(welcome) = welcome {
                tracing::debug!(
                    node = ?node,
                    resource = %welcome.url(),
                    "Forwarding to welcome resource"
                );
                if forwarder.forward(welcome, req, rsp, node)? {
                    return Ok(true);
                }
            }
        }

        for view in metaclass.views() {
            tracing::trace!(node = ?node, technology = view.name(), "Trying index view");
            match view.serve_index(req, rsp, node, metaclass.klass()) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(ViewError::Unavailable(reason)) => {
                    if self.missing_views.insert(view.name().to_string()) {
                        tracing::warn!(
                            technology = view.name(),
                            reason = %reason,
                            "View technology not present, skipped"
                        );
                    }
                }
                Err(ViewError::Failed(e)) => return Err(e),
            }
        }

        let index = self.open_side_file(metaclass.klass(), &self.settings.index_file);
        if index.is_some() && self.static_server.serve(req.headers(), rsp, index, 0)? {
            return Ok(true);
        }

        Ok(false)
    }

    /// Open side-file `name`, searching from `klass` up its supertypes.
    fn open_side_file(&self, klass: Klass, name: &str) -> Option<OpenResource> {
        klass
            .hierarchy()
            .find_map(|k| self.locator.open_path(&side_file_path(k, name)))
    }
}

/// Follow delegation proxies to the node that handles the request.
///
/// Stops at a proxy returning itself, or when the chain revisits a node.
fn unwrap_proxies(mut node: NodeRef) -> Option<NodeRef> {
    let mut visited: Vec<NodeRef> = Vec::new();
    loop {
        let Some(proxy) = node.as_proxy() else {
            return Some(node);
        };
        tracing::trace!(node = ?node, "Resolving proxy target");
        let Some(target) = proxy.target() else {
            tracing::debug!(node = ?node, "Proxy has no target");
            return None;
        };
        if same_node(&target, &node) {
            return Some(node);
        }
        if visited.iter().any(|seen| same_node(seen, &target)) {
            tracing::debug!(node = ?target, "Proxy chain loops, stopping");
            return Some(target);
        }
        visited.push(node);
        node = target;
    }
}

fn same_node(a: &NodeRef, b: &NodeRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Split a `/static/<key>` prefix off `servlet_path`.
fn strip_static_prefix(servlet_path: &str) -> (&str, bool) {
    match servlet_path.strip_prefix(STATIC_PREFIX) {
        Some(rest) => match rest.find('/') {
            Some(idx) => (&rest[idx..], true),
            None => ("", true),
        },
        None => (servlet_path, false),
    }
}

fn request_url(req: &StaplerRequest) -> String {
    req.head().uri().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::node::{Node, StaplerProxy};
    use std::sync::{Mutex, Weak};

    #[test]
    fn test_strip_static_prefix() {
        assert_eq!(strip_static_prefix("/static/v1/style.css"), ("/style.css", true));
        assert_eq!(strip_static_prefix("/static/v1/"), ("/", true));
        assert_eq!(strip_static_prefix("/static/v1"), ("", true));
        assert_eq!(strip_static_prefix("/items/1"), ("/items/1", false));
        assert_eq!(strip_static_prefix(""), ("", false));
    }

    struct Plain;
    impl Node for Plain {}

    #[test]
    fn test_side_file_path() {
        let path = side_file_path(Klass::of::<Plain>(), "index.html");
        assert!(path.starts_with("/WEB-INF/side-files/"));
        assert!(path.ends_with("/Plain/index.html"));
        assert!(!path.contains("::"));
    }

    /// Proxy whose target is set after construction.
    struct Forward {
        target: Mutex<Option<Weak<dyn Node>>>,
    }

    impl Forward {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                target: Mutex::new(None),
            })
        }

        fn point_at(&self, node: &NodeRef) {
            *self.target.lock().unwrap() = Some(Arc::downgrade(node));
        }
    }

    impl Node for Forward {
        fn as_proxy(&self) -> Option<&dyn StaplerProxy> {
            Some(self)
        }
    }

    impl StaplerProxy for Forward {
        fn target(&self) -> Option<NodeRef> {
            self.target.lock().unwrap().as_ref().and_then(Weak::upgrade)
        }
    }

    #[test]
    fn test_self_proxy_stops_unwrapping() {
        let a = Forward::new();
        let a_ref: NodeRef = a.clone();
        a.point_at(&a_ref);
        let resolved = unwrap_proxies(Arc::clone(&a_ref)).unwrap();
        assert!(same_node(&resolved, &a_ref));
    }

    #[test]
    fn test_proxy_cycle_stops_at_start() {
        let a = Forward::new();
        let b = Forward::new();
        let a_ref: NodeRef = a.clone();
        let b_ref: NodeRef = b.clone();
        a.point_at(&b_ref);
        b.point_at(&a_ref);
        let resolved = unwrap_proxies(Arc::clone(&a_ref)).unwrap();
        assert!(same_node(&resolved, &a_ref));
    }

    #[test]
    fn test_proxy_chain_reaches_plain_node() {
        let a = Forward::new();
        let a_ref: NodeRef = a.clone();
        let plain: NodeRef = Arc::new(Plain);
        a.point_at(&plain);
        let resolved = unwrap_proxies(a_ref).unwrap();
        assert!(same_node(&resolved, &plain));
    }

    #[test]
    fn test_proxy_without_target_is_absent() {
        let a: NodeRef = Forward::new();
        assert!(unwrap_proxies(a).is_none());
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = StaplerConfig::default();
        config.webapp.default_locale = "fr-CA".to_string();
        config.static_resources.default_encodings = Some("text/html=UTF-8".to_string());
        let settings = StaplerSettings::from_config(&config).unwrap();
        assert_eq!(settings.default_locale, Locale::new("fr", "CA", ""));
        assert_eq!(settings.default_encodings["text/html"], "UTF-8");

        config.static_resources.default_encodings = Some("text/html".to_string());
        assert!(matches!(
            StaplerSettings::from_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }
}
