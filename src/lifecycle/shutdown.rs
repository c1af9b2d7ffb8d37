//! Graceful shutdown signalling.
//!
//! One `Shutdown` is created at startup. The HTTP server holds a receiver
//! and stops accepting connections once it fires; in-flight dispatch walks
//! run to completion on their blocking workers.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

/// Fires once; every receiver subscribed before or after observes it.
pub struct Shutdown {
    notify: broadcast::Sender<()>,
    requested: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(1);
        Self {
            notify,
            requested: AtomicBool::new(false),
        }
    }

    /// Receiver that resolves when shutdown is requested.
    ///
    /// A receiver taken after the request would miss the broadcast, so check
    /// `is_requested` first when subscribing late.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notify.subscribe()
    }

    /// Request shutdown. Later calls are no-ops.
    pub fn trigger(&self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        let listeners = self.notify.send(()).unwrap_or(0);
        tracing::info!(listeners, "Shutdown requested");
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
