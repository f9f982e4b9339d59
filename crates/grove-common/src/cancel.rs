//! Cooperative cancellation.
//!
//! A host (an editor session, a batch analyzer) hands the same token to many
//! resolution calls and flips it when the results are no longer wanted. The
//! resolver polls it at fixed checkpoints and never blocks on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
