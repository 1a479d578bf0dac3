//! Version-stamped cancellation for option lookups.
//!
//! Every lookup a builder starts takes a fresh [`CancellationToken`] from its
//! [`LookupEpoch`]. Taking a token bumps the epoch, so all tokens handed out
//! earlier observe themselves as cancelled. A response whose token is
//! cancelled belongs to a superseded request.
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Per-builder version counter.
#[derive(Debug, Clone, Default)]
pub struct LookupEpoch {
    active: Arc<AtomicU64>,
}

impl LookupEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new lookup generation and returns its token.
    pub fn next(&self) -> CancellationToken {
        let version = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        CancellationToken {
            version,
            active: Some(self.active.clone()),
        }
    }

    /// Cancels every outstanding token without starting a new lookup.
    pub fn cancel_all(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct CancellationToken {
    version: u64,
    active: Option<Arc<AtomicU64>>,
}

impl CancellationToken {
    /// A token that is never cancelled.
    pub fn noop() -> Self {
        Self {
            version: 0,
            active: None,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.active {
            Some(active) => active.load(Ordering::SeqCst) != self.version,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_token_stays_active() {
        let epoch = LookupEpoch::new();
        let first = epoch.next();
        assert!(!first.is_cancelled());
        let second = epoch.next();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(second.version(), epoch.current());
    }

    #[test]
    fn cancel_all_cancels_latest() {
        let epoch = LookupEpoch::new();
        let token = epoch.next();
        epoch.cancel_all();
        assert!(token.is_cancelled());
    }

    #[test]
    fn noop_never_cancels() {
        let epoch = LookupEpoch::new();
        let token = CancellationToken::noop();
        epoch.next();
        epoch.cancel_all();
        assert!(!token.is_cancelled());
        assert_eq!(token.version(), 0);
    }
}
