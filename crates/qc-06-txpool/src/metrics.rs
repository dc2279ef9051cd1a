//! # Transaction Pool Metrics
//!
//! Prometheus metrics for monitoring admission and orphan churn.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-06-txpool = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `txpool_accepted_total` - Transactions accepted into the main pool
//! - `txpool_rejected_total` - Rejected transactions (by reason)
//! - `txpool_orphans_stored_total` - Transactions stored as orphans
//! - `txpool_orphans_promoted_total` - Orphans promoted to the main pool
//! - `txpool_orphans_expired_total` - Orphans removed by TTL expiry
//! - `txpool_orphans_evicted_total` - Orphans dropped at capacity
//! - `txpool_size` / `txpool_orphan_size` - Current pool sizes

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref TXS_ACCEPTED: IntCounter = register_int_counter!(
        "txpool_accepted_total",
        "Total number of transactions accepted into the main pool"
    )
    .expect("Failed to create TXS_ACCEPTED metric");

    /// Rejections, labeled by `TxPoolError::reason`
    pub static ref TXS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "txpool_rejected_total",
        "Total number of transactions rejected",
        &["reason"]
    )
    .expect("Failed to create TXS_REJECTED metric");

    pub static ref ORPHANS_STORED: IntCounter = register_int_counter!(
        "txpool_orphans_stored_total",
        "Total number of transactions stored as orphans"
    )
    .expect("Failed to create ORPHANS_STORED metric");

    pub static ref ORPHANS_PROMOTED: IntCounter = register_int_counter!(
        "txpool_orphans_promoted_total",
        "Total number of orphans promoted to the main pool"
    )
    .expect("Failed to create ORPHANS_PROMOTED metric");

    pub static ref ORPHANS_EXPIRED: IntCounter = register_int_counter!(
        "txpool_orphans_expired_total",
        "Total number of orphans removed by expiry"
    )
    .expect("Failed to create ORPHANS_EXPIRED metric");

    pub static ref ORPHANS_EVICTED: IntCounter = register_int_counter!(
        "txpool_orphans_evicted_total",
        "Total number of orphans evicted at capacity"
    )
    .expect("Failed to create ORPHANS_EVICTED metric");

    pub static ref POOL_SIZE: IntGauge = register_int_gauge!(
        "txpool_size",
        "Number of transactions in the main pool"
    )
    .expect("Failed to create POOL_SIZE metric");

    pub static ref ORPHAN_POOL_SIZE: IntGauge = register_int_gauge!(
        "txpool_orphan_size",
        "Number of transactions in the orphan pool"
    )
    .expect("Failed to create ORPHAN_POOL_SIZE metric");
}

#[cfg(feature = "metrics")]
pub fn record_accepted(count: usize) {
    TXS_ACCEPTED.inc_by(count as u64);
}

#[cfg(feature = "metrics")]
pub fn record_rejected(reason: &str) {
    TXS_REJECTED.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_orphan_stored() {
    ORPHANS_STORED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_orphans_promoted(count: usize) {
    ORPHANS_PROMOTED.inc_by(count as u64);
}

#[cfg(feature = "metrics")]
pub fn record_orphans_expired(count: usize) {
    ORPHANS_EXPIRED.inc_by(count as u64);
}

#[cfg(feature = "metrics")]
pub fn record_orphan_evicted() {
    ORPHANS_EVICTED.inc();
}

/// Record current pool sizes
#[cfg(feature = "metrics")]
pub fn record_pool_sizes(pool: usize, orphans: usize) {
    POOL_SIZE.set(pool as i64);
    ORPHAN_POOL_SIZE.set(orphans as i64);
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_accepted(_count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_orphan_stored() {}

#[cfg(not(feature = "metrics"))]
pub fn record_orphans_promoted(_count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_orphans_expired(_count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_orphan_evicted() {}

#[cfg(not(feature = "metrics"))]
pub fn record_pool_sizes(_pool: usize, _orphans: usize) {}
