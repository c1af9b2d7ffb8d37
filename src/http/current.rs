//! Request-scoped context.
//!
//! Code running during a dispatch walk (view renderers, strategies deep in
//! the graph) can reach the in-flight request and response without having
//! them passed down. The binding is per thread and is restored when the
//! scope that installed it ends, so nested dispatch sees its own request and
//! the enclosing one gets it back afterwards.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::http::request::RequestHead;
use crate::http::response::StaplerResponse;

#[derive(Clone)]
struct Current {
    request: Arc<RequestHead>,
    response: StaplerResponse,
}

thread_local! {
    static CURRENT: RefCell<Option<Current>> = const { RefCell::new(None) };
}

/// Request being served on this thread, if any.
pub fn current_request() -> Option<Arc<RequestHead>> {
    CURRENT.with(|c| c.borrow().as_ref().map(|cur| Arc::clone(&cur.request)))
}

/// Response being written on this thread, if any.
pub fn current_response() -> Option<StaplerResponse> {
    CURRENT.with(|c| c.borrow().as_ref().map(|cur| cur.response.clone()))
}

/// Binds a request/response pair to the current thread until dropped.
///
/// Dropping the scope, including during unwinding, reinstates whatever
/// binding was active when it was entered.
#[must_use = "the binding is released as soon as the scope is dropped"]
pub struct RequestScope {
    previous: Option<Current>,
    // Bound to the thread that installed it.
    _not_send: PhantomData<*const ()>,
}

impl RequestScope {
    pub fn enter(request: Arc<RequestHead>, response: StaplerResponse) -> Self {
        let previous = CURRENT.with(|c| c.borrow_mut().replace(Current { request, response }));
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|c| *c.borrow_mut() = previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::locale::Locale;
    use axum::body::{Body, Bytes};
    use axum::http::Request;
    use std::thread;

    fn head(path: &str) -> Arc<RequestHead> {
        let (parts, _) = Request::builder()
            .uri(path)
            .body(Body::empty())
            .unwrap()
            .into_parts();
        Arc::new(RequestHead::from_parts(parts, Bytes::new(), "", &Locale::default()))
    }

    fn current_path() -> Option<String> {
        current_request().map(|r| r.servlet_path().to_string())
    }

    #[test]
    fn test_nested_scopes_restore_outer_binding() {
        assert!(current_request().is_none());
        {
            let _outer = RequestScope::enter(head("/outer"), StaplerResponse::new());
            assert_eq!(current_path().as_deref(), Some("/outer"));
            {
                let _inner = RequestScope::enter(head("/inner"), StaplerResponse::new());
                assert_eq!(current_path().as_deref(), Some("/inner"));
            }
            assert_eq!(current_path().as_deref(), Some("/outer"));
        }
        assert!(current_request().is_none());
        assert!(current_response().is_none());
    }

    #[test]
    fn test_binding_restored_after_panic() {
        let _outer = RequestScope::enter(head("/outer"), StaplerResponse::new());
        let result = std::panic::catch_unwind(|| {
            let _inner = RequestScope::enter(head("/inner"), StaplerResponse::new());
            panic!("strategy blew up");
        });
        assert!(result.is_err());
        assert_eq!(current_path().as_deref(), Some("/outer"));
    }

    #[test]
    fn test_bindings_are_thread_local() {
        let _scope = RequestScope::enter(head("/main"), StaplerResponse::new());
        let seen = thread::spawn(current_path).join().unwrap();
        assert!(seen.is_none());
        assert_eq!(current_path().as_deref(), Some("/main"));
    }

    #[test]
    fn test_response_is_shared_with_scope() {
        let rsp = StaplerResponse::new();
        let _scope = RequestScope::enter(head("/"), rsp.clone());
        current_response().unwrap().send_redirect("/elsewhere/");
        assert_eq!(rsp.status(), axum::http::StatusCode::FOUND);
    }
}
