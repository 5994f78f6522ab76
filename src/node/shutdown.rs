// Shutdown - Stop signal and drain tracking for node tasks
//
// Every long-lived task holds a `Shutdown`. Triggering flips a watch flag all
// of them observe; each `Shutdown` also carries a guard sender, so once the
// last task finishes the drain receiver sees the channel close.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

/// Owner side of the shutdown signal
#[derive(Debug)]
pub struct ShutdownController {
    notify: watch::Sender<bool>,
    guard: Mutex<Option<mpsc::Sender<()>>>,
    drained: tokio::sync::Mutex<mpsc::Receiver<()>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(false);
        let (guard, drained) = mpsc::channel(1);
        Self {
            notify,
            guard: Mutex::new(Some(guard)),
            drained: tokio::sync::Mutex::new(drained),
        }
    }

    /// Hand out a listener for a new task; `None` once shutdown has begun
    pub fn subscribe(&self) -> Option<Shutdown> {
        let guard = self
            .guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;

        Some(Shutdown {
            notify: self.notify.subscribe(),
            _guard: guard,
        })
    }

    pub fn is_triggered(&self) -> bool {
        *self.notify.borrow()
    }

    /// Signal every task to stop
    pub fn trigger(&self) {
        self.notify.send_replace(true);
        self.guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Wait until every task holding a `Shutdown` has finished
    ///
    /// Returns false if `grace` elapsed first.
    pub async fn drain(&self, grace: Duration) -> bool {
        let mut drained = self.drained.lock().await;
        timeout(grace, drained.recv()).await.is_ok()
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Task side of the shutdown signal
#[derive(Clone, Debug)]
pub struct Shutdown {
    notify: watch::Receiver<bool>,
    _guard: mpsc::Sender<()>,
}

impl Shutdown {
    /// Resolve once shutdown has been triggered (or the controller is gone)
    pub async fn recv(&mut self) {
        loop {
            if *self.notify.borrow_and_update() {
                return;
            }
            if self.notify.changed().await.is_err() {
                return;
            }
        }
    }
}
