use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Save request raised from interrupt context (power-fail signal).
///
/// Raising only sets a flag; the main loop picks it up and performs the
/// forced save at a safe point. Cheap to clone, safe to call from any
/// thread or signal handler.
#[derive(Debug, Clone, Default)]
pub struct SaveTrigger {
    pending: Arc<AtomicBool>,
}

impl SaveTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Clear the flag, returning whether it was set
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}
