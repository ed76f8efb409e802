//! Shutdown coordination.

use tokio::sync::watch;

/// Owner side of the shutdown flag. Dropping it also counts as a trigger.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Cloneable receiver handed to anything that must stop on shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Resolve once shutdown has been triggered (immediately if it already was).
    pub async fn recv(&mut self) {
        while !*self.rx.borrow_and_update() {
            // Sender gone counts as shutdown too.
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    #[cfg(test)]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}
