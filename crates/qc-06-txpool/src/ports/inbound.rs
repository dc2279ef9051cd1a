//! # Inbound Port - TxPoolApi
//!
//! Primary driving port exposing the transaction pool to peer handlers,
//! local RPC and block-template builders.
//!
//! | Group | Methods | Lock |
//! |-------|---------|------|
//! | Admission | `process_transaction`, `try_accept`, `process_orphans` | write |
//! | Query | `is_transaction_in_pool`, `is_orphan_in_pool`, `have_transaction`, `count`, `orphan_count`, `get_transaction`, `tx_hashes`, `entries` | read |
//! | Freshness | `last_updated` | none |
//! | Removal | `remove_transaction`, `remove_double_spends`, `remove_orphan` | write |

use crate::domain::{AdmissionOutcome, Hash, Timestamp, Transaction, TxEntry, TxPoolError};
use std::sync::Arc;

/// Primary API for the transaction pool.
///
/// # Example
///
/// ```rust,ignore
/// use qc_06_txpool::ports::TxPoolApi;
///
/// fn relay(pool: &impl TxPoolApi, tx: Transaction) {
///     match pool.process_transaction(tx, true) {
///         Ok(accepted) if accepted.is_empty() => { /* stored as orphan */ }
///         Ok(accepted) => { /* announce every accepted entry */ }
///         Err(err) => { /* reject peer message */ }
///     }
/// }
/// ```
pub trait TxPoolApi: Send + Sync {
    /// Full admission: validates `tx`, then promotes any orphans it unblocks.
    ///
    /// Returns `tx` followed by every promoted orphan in promotion order,
    /// or an empty list when `tx` was stored as an orphan.
    ///
    /// # Errors
    /// - `OrphanRejected`: parents missing and `allow_orphan` is false
    /// - any admission error from [`TxPoolApi::try_accept`]
    fn process_transaction(
        &self,
        tx: Transaction,
        allow_orphan: bool,
    ) -> Result<Vec<TxEntry>, TxPoolError>;

    /// Single admission attempt. Does not store orphans or promote them.
    ///
    /// # Errors
    /// - `AlreadyInPool`: hash already in the main pool (or orphan pool when
    ///   `reject_duplicate_orphans`)
    /// - `Sanity`, `Input`, `Script`: validation failures
    /// - `PoolDoubleSpend`: an input is already claimed in the pool
    /// - `AlreadyConfirmed`: the transaction is already in the chain
    /// - `ChainState`: the view provider failed
    fn try_accept(
        &self,
        tx: Transaction,
        reject_duplicate_orphans: bool,
    ) -> Result<AdmissionOutcome, TxPoolError>;

    /// Promotes orphans unblocked by `accepted`, which is already available
    /// through the pool or the chain.
    fn process_orphans(&self, accepted: &Transaction) -> Vec<TxEntry>;

    fn is_transaction_in_pool(&self, hash: &Hash) -> bool;

    fn is_orphan_in_pool(&self, hash: &Hash) -> bool;

    /// True if the hash is in either pool.
    fn have_transaction(&self, hash: &Hash) -> bool;

    /// Number of main-pool transactions.
    fn count(&self) -> usize;

    fn orphan_count(&self) -> usize;

    fn get_transaction(&self, hash: &Hash) -> Option<Arc<Transaction>>;

    fn tx_hashes(&self) -> Vec<Hash>;

    /// Snapshot of every main-pool entry.
    fn entries(&self) -> Vec<TxEntry>;

    /// Time of the last main-pool change (ms). Lock-free.
    fn last_updated(&self) -> Timestamp;

    /// Removes a main-pool transaction; with `cascade`, its redeemers too.
    /// Returns the removed hashes. Absent hashes are a no-op.
    fn remove_transaction(&self, hash: &Hash, cascade: bool) -> Vec<Hash>;

    /// Evicts every pool transaction conflicting with `tx`'s inputs.
    fn remove_double_spends(&self, tx: &Transaction) -> Vec<Hash>;

    /// Removes an orphan; with `cascade`, the orphans redeeming it too.
    fn remove_orphan(&self, hash: &Hash, cascade: bool) -> Vec<Hash>;
}
