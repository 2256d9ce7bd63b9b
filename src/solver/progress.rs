use crate::types::SolveResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Progress tick handed to the caller's sink at phase boundaries
#[derive(Debug, Clone)]
pub struct SolveStats {
    pub phase: String,
    pub wall_time_ms: u64,
    pub best_objective: Option<f64>,
    pub solutions_found: u32,
}

/// Caller-supplied progress channel. The core never prints; the CLI
/// plugs an indicatif-backed sink in here.
pub trait ProgressSink {
    fn on_progress(&self, _stats: &SolveStats) {}
    fn on_solution(&self, _snapshot: &SolveResult) {}
}

/// Sink that swallows everything
pub struct NullSink;

impl ProgressSink for NullSink {}

/// Cooperative cancellation signal, honoured at phase boundaries.
/// A solve already in flight is bounded by its time-limit slice.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
