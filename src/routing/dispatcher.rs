//! Dispatch strategies.
//!
//! # Responsibilities
//! - Define the `Dispatcher` trait consulted for every node on the walk
//! - Provide ready-made strategies: named getters, dynamic getters,
//!   actions, index actions and plain closures
//!
//! # Design Decisions
//! - A strategy either declines, writes the response, or names the next node
//! - Typed strategies only match nodes that downcast to their type
//! - A declining strategy leaves the token cursor where it found it

use std::fmt;
use std::marker::PhantomData;

use crate::error::StaplerError;
use crate::http::request::StaplerRequest;
use crate::http::response::StaplerResponse;
use crate::routing::node::{Node, NodeRef};

/// Result of consulting one strategy.
#[derive(Debug)]
pub enum Dispatched {
    /// Not applicable; try the next strategy.
    Declined,
    /// The response has been written.
    Handled,
    /// Continue the walk on this node (`None` resolves to not-found).
    Descend(Option<NodeRef>),
}

/// A pluggable rule that may consume path tokens and/or produce a response.
pub trait Dispatcher: Send + Sync {
    fn dispatch(
        &self,
        req: &mut StaplerRequest,
        rsp: &StaplerResponse,
        node: &NodeRef,
    ) -> Result<Dispatched, StaplerError>;

    /// Short label used in logs.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

type DispatchResult = Result<Dispatched, StaplerError>;
type GetFn<T> = dyn Fn(&T) -> Option<NodeRef> + Send + Sync;
type DynamicFn<T> = dyn Fn(&T, &str) -> Option<NodeRef> + Send + Sync;
type ActionFn<T> =
    dyn Fn(&T, &mut StaplerRequest, &StaplerResponse) -> Result<(), StaplerError> + Send + Sync;
type NodeFn =
    dyn Fn(&mut StaplerRequest, &StaplerResponse, &NodeRef) -> DispatchResult + Send + Sync;

/// Consumes the token `name` and descends into the child the closure returns.
pub struct Getter<T> {
    name: String,
    get: Box<GetFn<T>>,
    _node: PhantomData<fn(&T)>,
}

impl<T: Node> Getter<T> {
    pub fn new<F>(name: impl Into<String>, get: F) -> Self
    where
        F: Fn(&T) -> Option<NodeRef> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            get: Box::new(get),
            _node: PhantomData,
        }
    }
}

impl<T: Node> Dispatcher for Getter<T> {
    fn dispatch(
        &self,
        req: &mut StaplerRequest,
        _rsp: &StaplerResponse,
        node: &NodeRef,
    ) -> Result<Dispatched, StaplerError> {
        if req.tokens().peek() != Some(self.name.as_str()) {
            return Ok(Dispatched::Declined);
        }
        let Some(this) = node.downcast_ref::<T>() else {
            return Ok(Dispatched::Declined);
        };
        req.tokens_mut().next_token();
        Ok(Dispatched::Descend((self.get)(this)))
    }

    fn describe(&self) -> String {
        format!("get {}", self.name)
    }
}

/// Consumes any next token the closure resolves to a child.
pub struct DynamicGetter<T> {
    get: Box<DynamicFn<T>>,
    _node: PhantomData<fn(&T)>,
}

impl<T: Node> DynamicGetter<T> {
    pub fn new<F>(get: F) -> Self
    where
        F: Fn(&T, &str) -> Option<NodeRef> + Send + Sync + 'static,
    {
        Self {
            get: Box::new(get),
            _node: PhantomData,
        }
    }
}

impl<T: Node> Dispatcher for DynamicGetter<T> {
    fn dispatch(
        &self,
        req: &mut StaplerRequest,
        _rsp: &StaplerResponse,
        node: &NodeRef,
    ) -> Result<Dispatched, StaplerError> {
        let Some(this) = node.downcast_ref::<T>() else {
            return Ok(Dispatched::Declined);
        };
        let Some(token) = req.tokens().peek() else {
            return Ok(Dispatched::Declined);
        };
        match (self.get)(this, token) {
            Some(child) => {
                req.tokens_mut().next_token();
                Ok(Dispatched::Descend(Some(child)))
            }
            None => Ok(Dispatched::Declined),
        }
    }

    fn describe(&self) -> String {
        "get dynamic".to_string()
    }
}

/// Consumes the token `name` and lets the closure write the response.
pub struct Action<T> {
    name: String,
    run: Box<ActionFn<T>>,
    _node: PhantomData<fn(&T)>,
}

impl<T: Node> Action<T> {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&T, &mut StaplerRequest, &StaplerResponse) -> Result<(), StaplerError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(run),
            _node: PhantomData,
        }
    }
}

impl<T: Node> Dispatcher for Action<T> {
    fn dispatch(
        &self,
        req: &mut StaplerRequest,
        rsp: &StaplerResponse,
        node: &NodeRef,
    ) -> Result<Dispatched, StaplerError> {
        if req.tokens().peek() != Some(self.name.as_str()) {
            return Ok(Dispatched::Declined);
        }
        let Some(this) = node.downcast_ref::<T>() else {
            return Ok(Dispatched::Declined);
        };
        req.tokens_mut().next_token();
        (self.run)(this, req, rsp)?;
        Ok(Dispatched::Handled)
    }

    fn describe(&self) -> String {
        format!("do {}", self.name)
    }
}

/// Writes the response for a node whose path is fully consumed.
pub struct IndexAction<T> {
    run: Box<ActionFn<T>>,
    _node: PhantomData<fn(&T)>,
}

impl<T: Node> IndexAction<T> {
    pub fn new<F>(run: F) -> Self
    where
        F: Fn(&T, &mut StaplerRequest, &StaplerResponse) -> Result<(), StaplerError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            run: Box::new(run),
            _node: PhantomData,
        }
    }
}

impl<T: Node> Dispatcher for IndexAction<T> {
    fn dispatch(
        &self,
        req: &mut StaplerRequest,
        rsp: &StaplerResponse,
        node: &NodeRef,
    ) -> Result<Dispatched, StaplerError> {
        if req.tokens().has_more() {
            return Ok(Dispatched::Declined);
        }
        let Some(this) = node.downcast_ref::<T>() else {
            return Ok(Dispatched::Declined);
        };
        (self.run)(this, req, rsp)?;
        Ok(Dispatched::Handled)
    }

    fn describe(&self) -> String {
        "do index".to_string()
    }
}

/// Strategy backed by an arbitrary closure over the untyped node.
pub struct FnDispatcher {
    label: String,
    run: Box<NodeFn>,
}

impl FnDispatcher {
    pub fn new<F>(label: impl Into<String>, run: F) -> Self
    where
        F: Fn(&mut StaplerRequest, &StaplerResponse, &NodeRef) -> Result<Dispatched, StaplerError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            label: label.into(),
            run: Box::new(run),
        }
    }
}

impl Dispatcher for FnDispatcher {
    fn dispatch(
        &self,
        req: &mut StaplerRequest,
        rsp: &StaplerResponse,
        node: &NodeRef,
    ) -> Result<Dispatched, StaplerError> {
        (self.run)(req, rsp, node)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

impl fmt::Debug for dyn Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::RequestHead;
    use crate::resources::locale::Locale;
    use crate::routing::tokens::TokenList;
    use axum::body::{Body, Bytes};
    use axum::http::Request;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct Shop {
        items: HashMap<String, NodeRef>,
    }
    impl Node for Shop {}

    struct Item;
    impl Node for Item {}

    fn request(path: &str) -> StaplerRequest {
        let (parts, _) = Request::builder()
            .uri(path)
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let head = RequestHead::from_parts(parts, Bytes::new(), "", &Locale::default());
        StaplerRequest::new(Arc::new(head), TokenList::new(path))
    }

    fn shop() -> NodeRef {
        let mut items = HashMap::new();
        items.insert("42".to_string(), Arc::new(Item) as NodeRef);
        Arc::new(Shop { items })
    }

    #[test]
    fn test_getter_matches_name_only() {
        let getter = Getter::new("items", |_: &Shop| Some(Arc::new(Item) as NodeRef));
        let rsp = StaplerResponse::new();
        let node = shop();

        let mut req = request("/other");
        assert!(matches!(getter.dispatch(&mut req, &rsp, &node), Ok(Dispatched::Declined)));
        assert_eq!(req.tokens().index(), 0);

        let mut req = request("/items/42");
        assert!(matches!(
            getter.dispatch(&mut req, &rsp, &node),
            Ok(Dispatched::Descend(Some(_)))
        ));
        assert_eq!(req.tokens().index(), 1);
    }

    #[test]
    fn test_getter_declines_foreign_types() {
        let getter = Getter::new("items", |_: &Item| None);
        let mut req = request("/items");
        let result = getter.dispatch(&mut req, &StaplerResponse::new(), &shop());
        assert!(matches!(result, Ok(Dispatched::Declined)));
        assert_eq!(req.tokens().index(), 0);
    }

    #[test]
    fn test_dynamic_getter_restores_cursor_on_miss() {
        let getter = DynamicGetter::new(|shop: &Shop, token: &str| shop.items.get(token).cloned());
        let rsp = StaplerResponse::new();
        let node = shop();

        let mut req = request("/7");
        assert!(matches!(getter.dispatch(&mut req, &rsp, &node), Ok(Dispatched::Declined)));
        assert_eq!(req.tokens().index(), 0);

        let mut req = request("/42");
        assert!(matches!(
            getter.dispatch(&mut req, &rsp, &node),
            Ok(Dispatched::Descend(Some(_)))
        ));
        assert!(!req.tokens().has_more());
    }

    #[test]
    fn test_action_writes_response() {
        let action = Action::new(
            "hello",
            |_: &Shop, _req: &mut StaplerRequest, rsp: &StaplerResponse| {
                rsp.send_text("text/plain", "hi");
                Ok(())
            },
        );
        let rsp = StaplerResponse::new();
        let mut req = request("/hello");
        assert!(matches!(action.dispatch(&mut req, &rsp, &shop()), Ok(Dispatched::Handled)));
        assert_eq!(rsp.body(), b"hi");
    }

    #[test]
    fn test_index_action_requires_consumed_path() {
        let index =
            IndexAction::new(|_: &Shop, _req: &mut StaplerRequest, _rsp: &StaplerResponse| Ok(()));
        let rsp = StaplerResponse::new();
        assert!(matches!(
            index.dispatch(&mut request("/items"), &rsp, &shop()),
            Ok(Dispatched::Declined)
        ));
        assert!(matches!(
            index.dispatch(&mut request("/"), &rsp, &shop()),
            Ok(Dispatched::Handled)
        ));
    }
}
