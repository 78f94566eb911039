//! One-shot synchronization for the first available credential token.
//!
//! Callers wait for a token to become available; the supervisor sets the
//! value once renewal has started and clears it when the token goes stale.

use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

#[derive(Debug, Default)]
struct Inner {
    set: bool,
    token: String,
    waiters: Vec<oneshot::Sender<()>>,
}

/// Stores a credential token and lets consumers block until a valid one
/// exists.
///
/// Internally serialized; none of the operations block, so the lock is never
/// held across I/O.
#[derive(Debug, Default)]
pub struct TokenFuture {
    inner: Mutex<Inner>,
}

impl TokenFuture {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a handle that becomes ready once a valid token is available
    /// via [`get`](Self::get).
    ///
    /// When a token is already set the handle is ready immediately. A later
    /// [`clear`](Self::clear) does not revoke handles returned while the
    /// token was set.
    pub fn wait(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.lock();
        if inner.set {
            let _ = tx.send(());
        } else {
            inner.waiters.push(tx);
        }
        rx
    }

    /// Record `token` and release every pending waiter. Idempotent while
    /// the future stays set.
    pub fn set(&self, token: impl Into<String>) {
        let mut inner = self.lock();
        inner.set = true;
        inner.token = token.into();
        for waiter in inner.waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    /// Revert to the not-ready state. New waiters block until the next
    /// [`set`](Self::set); waiters registered before the clear keep waiting.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.set = false;
        inner.token.clear();
    }

    /// The last value passed to [`set`](Self::set); empty if never set or
    /// cleared since.
    pub fn get(&self) -> String {
        self.lock().token.clone()
    }
}
