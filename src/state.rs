//! Session-scoped state shared between the frame loop and the render pass.
//!
//! The frame loop is the only writer of category results; the render pass is
//! the only consumer of the dirty flag. Both go through one mutex, so a result
//! and its dirty flag are always observed together.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::category::CategorizedResult;

#[derive(Debug, Default)]
struct SessionInner {
    detected: CategorizedResult,
    dirty: bool,
    playing: bool,
    updates: u64,
}

/// Cloneable handle to the shared session state.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    inner: Arc<Mutex<SessionInner>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a new result and mark it pending (clean -> dirty).
    pub fn publish(&self, result: CategorizedResult) {
        let mut inner = self.lock();
        inner.detected = result;
        inner.dirty = true;
        inner.updates += 1;
    }

    /// Consume the pending result, if any (dirty -> clean).
    pub fn take_pending(&self) -> Option<CategorizedResult> {
        let mut inner = self.lock();
        if !inner.dirty {
            return None;
        }
        inner.dirty = false;
        Some(inner.detected.clone())
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// Latest published result, pending or not.
    pub fn current(&self) -> CategorizedResult {
        self.lock().detected.clone()
    }

    /// Number of results published since the last reset.
    pub fn update_count(&self) -> u64 {
        self.lock().updates
    }

    pub fn set_playing(&self, playing: bool) {
        self.lock().playing = playing;
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    /// Back to initial: empty result, clean. Leaves the playing flag alone.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.detected = CategorizedResult::default();
        inner.dirty = false;
        inner.updates = 0;
    }
}
