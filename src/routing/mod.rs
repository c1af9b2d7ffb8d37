//! Object graph routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path (static prefix already removed)
//!     → tokens.rs (split into segments with a cursor)
//!     → engine.rs (walk loop, starting at the root node)
//!         → node.rs (unwrap StaplerProxy targets)
//!         → ancestor.rs (record settled node)
//!         → fully consumed? redirect / delete / view.rs / index side-file
//!         → metaclass.rs (strategies for the node's type)
//!         → dispatcher.rs (first strategy that handles or descends)
//!     → Response written, or 404
//! ```
//!
//! # Design Decisions
//! - Strategies are registered per type and inherited along `Klass` chains
//! - First match wins, in registration order
//! - Metaclasses are cached and safe under concurrent first access

pub mod ancestor;
pub mod dispatcher;
pub mod engine;
pub mod metaclass;
pub mod node;
pub mod tokens;
pub mod view;

pub use dispatcher::{
    Action, Dispatched, Dispatcher, DynamicGetter, FnDispatcher, Getter, IndexAction,
};
pub use engine::{side_file_path, DispatchOutcome, Stapler, StaplerSettings};
pub use metaclass::{MetaClass, MetaClassRegistry};
pub use node::{HttpDeletable, Klass, Node, NodeRef, StaplerProxy};
pub use view::{ResourceForwarder, ViewError, ViewTechnology};
