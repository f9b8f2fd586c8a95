// src/engine/shutdown.rs

//! Cooperative shutdown token.
//!
//! [`ShutdownHandle::trigger`] flips a flag every [`Shutdown`] clone can
//! poll (`is_triggered`) or await (`triggered`). The monitor checks it
//! before each cycle, between runs, and races it against every wait.

use std::sync::Arc;

use tokio::sync::watch;

/// Sending half; trigger once to stop the monitor.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

/// Receiving half, held by the monitor.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn shutdown_channel() -> (ShutdownHandle, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx: Arc::new(tx) }, Shutdown { rx })
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been requested.
    ///
    /// If every handle is dropped without triggering, this never resolves.
    pub async fn triggered(&mut self) {
        let closed = self.rx.wait_for(|stop| *stop).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}
