//! Cooperative cancellation for work running on blocking threads.
//!
//! A timed-out future can be dropped, but a `spawn_blocking` closure keeps
//! running. Blocking steps call [`Cancellation::check`] between units of work,
//! and hold a [`WorkGuard`] while they run so the caller can wait for them to
//! stop before reporting the timeout.

use anyhow::{Result, bail};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    busy: Arc<Mutex<()>>,
}

/// Held by blocking work for as long as it may still touch the file system.
#[derive(Debug)]
pub struct WorkGuard {
    _guard: OwnedMutexGuard<()>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails once [`Cancellation::cancel`] has been called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            bail!("Operation cancelled");
        }
        Ok(())
    }

    /// Mark the start of blocking work.
    pub async fn begin_work(&self) -> WorkGuard {
        WorkGuard {
            _guard: self.busy.clone().lock_owned().await,
        }
    }

    /// Wait until no [`WorkGuard`] is held.
    pub async fn settled(&self) {
        let _idle = self.busy.lock().await;
    }
}
