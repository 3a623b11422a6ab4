//! Process-wide shutdown signal.
//!
//! A `watch` channel carrying `false` until shutdown is requested. Every
//! long-running task holds a [`ShutdownSignal`] and stops once it flips.
//! Dropping every [`ShutdownTrigger`] also counts as shutdown.

use std::sync::Arc;
use tokio::sync::watch;

/// Requests shutdown. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

/// Observes shutdown. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

/// Create a linked trigger and signal
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx: Arc::new(tx) }, ShutdownSignal { rx })
}

impl ShutdownTrigger {
    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// New signal observing this trigger
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Check if shutdown was requested
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl ShutdownSignal {
    /// Check if shutdown was requested
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested. Cancel-safe.
    pub async fn triggered(&mut self) {
        // Err means every trigger was dropped
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}
