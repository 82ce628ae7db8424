use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative stop request shared between listeners and the search.
///
/// Listeners only ever set the flag. The search samples it between oracle
/// calls; an in-flight checkout or evaluation always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    requested: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the search to stop at its next checkpoint. Idempotent.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
