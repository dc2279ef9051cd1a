//! Outbound (Driven) ports for the transaction pool.
//!
//! These traits define dependencies on external systems that the pool
//! needs for admission.

use crate::domain::{ChainStateError, ScriptError, Timestamp, Transaction, UtxoView};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// CHAIN STATE & SCRIPTS
// =============================================================================

/// Chain state provider for input lookup.
pub trait UtxoViewProvider: Send + Sync {
    /// Returns a snapshot holding an entry for the source transaction of
    /// every input of `tx`, and for `tx`'s own hash.
    ///
    /// Sources that are unknown to the chain must still appear, as `None`,
    /// so the pool can report them as missing parents.
    fn fetch_utxo_view(&self, tx: &Transaction) -> Result<UtxoView, ChainStateError>;
}

/// Authorization script verification.
///
/// Called after input/fee validation succeeds; must be side-effect free.
pub trait ScriptValidator: Send + Sync {
    fn validate_scripts(&self, tx: &Transaction, view: &UtxoView) -> Result<(), ScriptError>;
}

// =============================================================================
// TIME
// =============================================================================

/// Millisecond clock used for orphan expiry and `last_updated`.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Lets callers keep a handle on a clock after boxing it into the service.
impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> Timestamp {
        T::now(self)
    }
}

/// Wall clock. A clock set before the epoch reads as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as Timestamp)
            .unwrap_or(0)
    }
}

// =============================================================================
// TEST DOUBLES
// =============================================================================

/// Fails script validation for input 0 of every transaction.
#[cfg(test)]
pub struct RejectingScripts;

#[cfg(test)]
impl ScriptValidator for RejectingScripts {
    fn validate_scripts(&self, _tx: &Transaction, _view: &UtxoView) -> Result<(), ScriptError> {
        Err(ScriptError::VerificationFailed {
            index: 0,
            reason: "signature mismatch".into(),
        })
    }
}

/// Manually driven clock.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockTimeSource(std::sync::atomic::AtomicU64);

#[cfg(test)]
impl MockTimeSource {
    pub fn new(start: Timestamp) -> Self {
        Self(std::sync::atomic::AtomicU64::new(start))
    }

    pub fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set(&self, now: Timestamp) {
        self.0.store(now, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}
