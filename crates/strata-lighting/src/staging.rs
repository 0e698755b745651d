//! Cross-thread handoff of positions that need relighting.
//!
//! Worker threads cannot touch the live chunk map, so generation and load jobs
//! record the global positions of blocks they want relit here. The main thread
//! drains the queue into the [`LightingEngine`](crate::LightingEngine) once per
//! tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::IVec3;

/// Shared, lock-protected list of global block positions.
#[derive(Clone, Debug, Default)]
pub struct LightStaging {
    inner: Arc<Mutex<Vec<IVec3>>>,
}

impl LightStaging {
    /// Creates an empty staging queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages one global block position.
    pub fn push(&self, position: IVec3) {
        self.lock().push(position);
    }

    /// Stages many positions under one lock.
    pub fn extend(&self, positions: impl IntoIterator<Item = IVec3>) {
        self.lock().extend(positions);
    }

    /// Removes and returns everything staged so far.
    pub fn take(&self) -> Vec<IVec3> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of staged positions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a Vec half-written.
    fn lock(&self) -> MutexGuard<'_, Vec<IVec3>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
