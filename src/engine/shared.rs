//! Thread boundary for a `Network`.
//!
//! Evaluation runs synchronously on whichever thread holds the lock.
//! Callbacks receive a `NodeContext` borrowing the already locked network,
//! so re-entrant evaluation never locks twice.

use crate::engine::network::Network;
use crate::error::{EngineError, EngineResult};
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle to a network shared between threads.
#[derive(Clone, Default)]
pub struct SharedNetwork {
    inner: Arc<Mutex<Network>>,
}

impl SharedNetwork {
    pub fn new(network: Network) -> Self {
        Self {
            inner: Arc::new(Mutex::new(network)),
        }
    }

    /// Block until the network is free.
    pub fn lock(&self) -> EngineResult<MutexGuard<'_, Network>> {
        self.inner.lock().map_err(|_| EngineError::LockPoisoned)
    }

    /// Run `f` with exclusive access.
    pub fn with<R>(&self, f: impl FnOnce(&mut Network) -> EngineResult<R>) -> EngineResult<R> {
        let mut guard = self.lock()?;
        f(&mut guard)
    }

    /// Non-blocking variant of `lock`; `None` while another thread holds it.
    pub fn try_lock(&self) -> EngineResult<Option<MutexGuard<'_, Network>>> {
        match self.inner.try_lock() {
            Ok(guard) => Ok(Some(guard)),
            Err(std::sync::TryLockError::WouldBlock) => Ok(None),
            Err(std::sync::TryLockError::Poisoned(_)) => Err(EngineError::LockPoisoned),
        }
    }
}

impl From<Network> for SharedNetwork {
    fn from(network: Network) -> Self {
        Self::new(network)
    }
}
