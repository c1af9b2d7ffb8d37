//! Object graph nodes and their runtime types.
//!
//! # Responsibilities
//! - Define the `Node` trait every walkable object implements
//! - Describe a node's runtime type (`Klass`) and its declared supertypes
//! - Expose the optional delegate-target and deletable capabilities
//!
//! # Design Decisions
//! - Capabilities are discovered through `as_*` accessors, not downcasts
//! - A type hierarchy is declared explicitly (`Klass::extending`), since
//!   composition replaces inheritance
//! - Nodes embedding a supertype value can expose it through `as_supertype`
//!   so strategies registered for the supertype still apply

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::StaplerError;
use crate::http::request::StaplerRequest;
use crate::http::response::StaplerResponse;

/// Shared handle to a node in the object graph.
pub type NodeRef = Arc<dyn Node>;

/// Runtime type descriptor of a node.
#[derive(Clone, Copy)]
pub struct Klass {
    id: TypeId,
    name: &'static str,
    superclass: Option<fn() -> Klass>,
}

impl Klass {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            superclass: None,
        }
    }

    /// Declare the supertype whose strategies and side-files this type inherits.
    pub fn extending(self, superclass: fn() -> Klass) -> Self {
        Self {
            superclass: Some(superclass),
            ..self
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully-qualified Rust type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn superclass(&self) -> Option<Klass> {
        self.superclass.map(|f| f())
    }

    /// This type followed by its supertypes, most specific first.
    pub fn hierarchy(&self) -> impl Iterator<Item = Klass> {
        std::iter::successors(Some(*self), Klass::superclass)
    }

    /// Type name as a resource directory: `app::model::Item` → `app/model/Item`.
    ///
    /// Generic arguments are dropped.
    pub fn resource_path(&self) -> String {
        let name = self.name.split('<').next().unwrap_or(self.name);
        name.replace("::", "/")
    }
}

impl PartialEq for Klass {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Klass {}

impl Hash for Klass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Klass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An object reachable from the application root.
pub trait Node: Any + Send + Sync {
    /// Runtime type used to look up strategies and side-files.
    fn klass(&self) -> Klass {
        Klass::of::<Self>()
    }

    /// View of this node as one of its declared supertypes.
    fn as_supertype(&self, _id: TypeId) -> Option<&dyn Any> {
        None
    }

    fn as_proxy(&self) -> Option<&dyn StaplerProxy> {
        None
    }

    fn as_deletable(&self) -> Option<&dyn HttpDeletable> {
        None
    }
}

impl dyn Node {
    /// Borrow this node as `T`, either directly or through `as_supertype`.
    pub fn downcast_ref<T: Node>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>().or_else(|| {
            self.as_supertype(TypeId::of::<T>())
                .and_then(|view| view.downcast_ref::<T>())
        })
    }

    pub fn is<T: Node>(&self) -> bool {
        let any: &dyn Any = self;
        any.is::<T>()
    }
}

impl fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:p}", self.klass(), self as *const dyn Node)
    }
}

/// Delegate-target capability: the walk continues on the returned node.
///
/// Returning the node itself means "do not delegate further"; returning
/// `None` makes the request resolve to not-found.
pub trait StaplerProxy: Send + Sync {
    fn target(&self) -> Option<NodeRef>;
}

/// Invoked for `DELETE` requests once the path is fully consumed.
pub trait HttpDeletable: Send + Sync {
    fn delete(&self, req: &mut StaplerRequest, rsp: &StaplerResponse) -> Result<(), StaplerError>;
}
