//! Run abort signalling.
//!
//! The binary triggers the controller on Ctrl-C; the confirmation gate
//! listens for it while waiting for an answer and during the grace period,
//! so an operator can still back out after typing `yes`.

use tokio::sync::watch;

/// Owns the abort flag. Dropping it without triggering leaves every
/// [`AbortSignal`] pending forever.
#[derive(Debug)]
pub struct AbortController {
    tx: watch::Sender<bool>,
}

impl AbortController {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Returns a signal that resolves once [`trigger`](Self::trigger) is called.
    #[must_use]
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Raises the abort flag for every signal.
    pub fn trigger(&self) {
        // Ignore send errors -- receivers may have been dropped
        let _ = self.tx.send(true);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of an [`AbortController`].
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the abort flag is raised. Pends forever if the
    /// controller is dropped first.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
