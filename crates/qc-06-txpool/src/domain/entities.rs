//! Core domain entities for the transaction pool.
//!
//! Pool entries share transactions through `Arc` so the main pool, the
//! orphan pool and callers can hold the same immutable value.

use std::sync::Arc;

// Re-export from shared-types for convenience
pub use shared_types::{Hash, OutPoint, Transaction, TxIn, TxOut, UtxoEntry, UtxoView, MAX_AMOUNT};

/// Timestamp in milliseconds since UNIX epoch.
pub type Timestamp = u64;

const MINUTE_MS: u64 = 60_000;

/// A transaction accepted into the main pool.
#[derive(Clone, Debug)]
pub struct TxEntry {
    /// The accepted transaction.
    pub tx: Arc<Transaction>,
    /// Timestamp when added to the pool (ms).
    pub added_at: Timestamp,
    /// Inputs minus outputs, computed during admission.
    pub fee: i64,
}

impl TxEntry {
    pub fn new(tx: Arc<Transaction>, added_at: Timestamp, fee: i64) -> Self {
        Self { tx, added_at, fee }
    }

    pub fn hash(&self) -> Hash {
        self.tx.hash()
    }
}

/// A transaction waiting for one or more parents.
#[derive(Clone, Debug)]
pub struct OrphanEntry {
    pub tx: Arc<Transaction>,
    /// The orphan is dropped by the next expiry scan after this time (ms).
    pub expires_at: Timestamp,
}

impl OrphanEntry {
    pub fn new(tx: Arc<Transaction>, expires_at: Timestamp) -> Self {
        Self { tx, expires_at }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }
}

/// Result of a single admission attempt.
#[derive(Clone, Debug)]
pub enum AdmissionOutcome {
    /// The transaction entered the main pool.
    Accepted(TxEntry),
    /// One or more source transactions are unknown or fully spent.
    /// Hashes are sorted; nothing was added to either pool.
    MissingParents(Vec<Hash>),
}

impl AdmissionOutcome {
    /// The computed fee when accepted.
    pub fn fee(&self) -> Option<i64> {
        match self {
            Self::Accepted(entry) => Some(entry.fee),
            Self::MissingParents(_) => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Transaction pool configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxPoolConfig {
    /// Ceiling for any single amount and for running totals.
    pub max_amount: i64,
    /// Maximum orphans kept at once. Zero disables orphan tracking.
    pub max_orphan_txs: usize,
    /// Orphan lifetime (milliseconds).
    pub orphan_ttl_ms: u64,
    /// Minimum time between orphan expiry scans (milliseconds).
    pub orphan_expire_scan_interval_ms: u64,
}

impl Default for TxPoolConfig {
    fn default() -> Self {
        Self {
            max_amount: MAX_AMOUNT,
            max_orphan_txs: 1000,
            orphan_ttl_ms: 15 * MINUTE_MS,
            orphan_expire_scan_interval_ms: 5 * MINUTE_MS,
        }
    }
}

impl TxPoolConfig {
    /// Environment variable overriding `max_orphan_txs`.
    pub const ENV_MAX_ORPHANS: &'static str = "QC_TXPOOL_MAX_ORPHANS";
    /// Environment variable overriding `orphan_ttl_ms`.
    pub const ENV_ORPHAN_TTL_MS: &'static str = "QC_TXPOOL_ORPHAN_TTL_MS";
    /// Environment variable overriding `orphan_expire_scan_interval_ms`.
    pub const ENV_ORPHAN_SCAN_INTERVAL_MS: &'static str = "QC_TXPOOL_ORPHAN_SCAN_INTERVAL_MS";

    /// Creates a minimal config for testing.
    pub fn for_testing() -> Self {
        Self {
            max_orphan_txs: 5,
            orphan_ttl_ms: 1_000,
            orphan_expire_scan_interval_ms: 500,
            ..Default::default()
        }
    }

    /// Defaults overridden by any `QC_TXPOOL_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    /// name. Unparsable values fall back to the default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            max_orphan_txs: parse_or(&lookup, Self::ENV_MAX_ORPHANS, defaults.max_orphan_txs),
            orphan_ttl_ms: parse_or(&lookup, Self::ENV_ORPHAN_TTL_MS, defaults.orphan_ttl_ms),
            orphan_expire_scan_interval_ms: parse_or(
                &lookup,
                Self::ENV_ORPHAN_SCAN_INTERVAL_MS,
                defaults.orphan_expire_scan_interval_ms,
            ),
            ..defaults
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %raw, fallback = %default, "Ignoring unparsable config value");
            default
        }),
        None => default,
    }
}
