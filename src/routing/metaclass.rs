//! Per-type dispatch metadata.
//!
//! # Responsibilities
//! - Register dispatch strategies against node types
//! - Assemble a `MetaClass` per runtime type: its own strategies followed
//!   by those of its supertypes, most specific first
//! - Cache assembled metaclasses for concurrent readers
//! - Carry the view technologies consulted for index views
//!
//! # Design Decisions
//! - Read-through cache keyed by `TypeId`; concurrent first lookups may
//!   both build, the first insert wins and both observe it
//! - Every registration bumps a generation counter; a cached metaclass
//!   built under an older generation is rebuilt on its next lookup, so a
//!   build racing a registration is never served afterwards
//! - Strategy order is registration order, which makes lookups deterministic

use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use crate::routing::dispatcher::Dispatcher;
use crate::routing::node::{Klass, Node};
use crate::routing::view::ViewTechnology;

/// Dispatch metadata of one runtime type.
#[derive(Debug)]
pub struct MetaClass {
    klass: Klass,
    generation: u64,
    dispatchers: Vec<Arc<dyn Dispatcher>>,
    views: Vec<Arc<dyn ViewTechnology>>,
}

impl MetaClass {
    pub fn klass(&self) -> Klass {
        self.klass
    }

    /// Strategies to consult, in order.
    pub fn dispatchers(&self) -> &[Arc<dyn Dispatcher>] {
        &self.dispatchers
    }

    /// View technologies, most specific first.
    pub fn views(&self) -> &[Arc<dyn ViewTechnology>] {
        &self.views
    }
}

/// Registry of strategies keyed by node type.
#[derive(Default)]
pub struct MetaClassRegistry {
    declared: DashMap<TypeId, Vec<Arc<dyn Dispatcher>>>,
    views: RwLock<Vec<Arc<dyn ViewTechnology>>>,
    cache: DashMap<TypeId, Arc<MetaClass>>,
    generation: AtomicU64,
}

impl MetaClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy for nodes of type `T`.
    pub fn register<T: Node>(&self, dispatcher: impl Dispatcher + 'static) -> &Self {
        self.register_for(Klass::of::<T>(), Arc::new(dispatcher))
    }

    /// Append a strategy for `klass`.
    pub fn register_for(&self, klass: Klass, dispatcher: Arc<dyn Dispatcher>) -> &Self {
        tracing::debug!(
            klass = ?klass,
            strategy = %dispatcher.describe(),
            "Registering dispatch strategy"
        );
        self.declared.entry(klass.id()).or_default().push(dispatcher);
        self.invalidate();
        self
    }

    /// Append a view technology; earlier ones are consulted first.
    pub fn add_view_technology(&self, view: Arc<dyn ViewTechnology>) -> &Self {
        self.views
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(view);
        self.invalidate();
        self
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.clear();
    }

    /// Metaclass for `klass`, built on first use.
    pub fn get(&self, klass: Klass) -> Arc<MetaClass> {
        let generation = self.generation.load(Ordering::Acquire);
        if let Some(cached) = self.cache.get(&klass.id()) {
            if cached.generation >= generation {
                return Arc::clone(cached.value());
            }
        }
        let built = Arc::new(self.build(klass, generation));
        let entry = self
            .cache
            .entry(klass.id())
            .and_modify(|cached| {
                if cached.generation < generation {
                    *cached = Arc::clone(&built);
                }
            })
            .or_insert(built);
        Arc::clone(entry.value())
    }

    fn build(&self, klass: Klass, generation: u64) -> MetaClass {
        let dispatchers: Vec<_> = klass
            .hierarchy()
            .filter_map(|k| self.declared.get(&k.id()).map(|d| d.value().clone()))
            .flatten()
            .collect();
        let views = self
            .views
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        tracing::trace!(klass = ?klass, strategies = dispatchers.len(), "Built metaclass");
        MetaClass {
            klass,
            generation,
            dispatchers,
            views,
        }
    }
}
