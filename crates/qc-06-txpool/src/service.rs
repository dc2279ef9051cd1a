//! # Transaction Pool Service
//!
//! Wires the domain indices to the outbound ports behind a single
//! reader/writer lock.
//!
//! ## Locking
//!
//! Every mutating entry point holds the write lock for its whole duration,
//! including the chain-state fetch and script validation. Queries take the
//! read lock. `last_updated` is an atomic shared with the main pool and is
//! read without locking.
//!
//! ## Admission pipeline
//!
//! ```text
//! duplicate → sanity → pool double-spend → fetch view + backfill from pool
//!   → already confirmed? → missing parents? → inputs/fee → scripts → add
//! ```

use crate::domain::{
    check_inputs, check_sanity, AdmissionOutcome, Hash, MainPool, OrphanEviction, OrphanPool,
    Timestamp, Transaction, TxEntry, TxPoolConfig, TxPoolError, UtxoEntry, UtxoView,
};
use crate::metrics;
use crate::ports::{ScriptValidator, SystemTimeSource, TimeSource, TxPoolApi, UtxoViewProvider};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything guarded by the pool lock.
#[derive(Debug)]
struct PoolState {
    main: MainPool,
    orphans: OrphanPool,
}

/// Transaction pool service.
pub struct TxPoolService<C, S>
where
    C: UtxoViewProvider,
    S: ScriptValidator,
{
    chain: Arc<C>,
    scripts: Arc<S>,
    config: TxPoolConfig,
    time_source: Box<dyn TimeSource>,
    state: RwLock<PoolState>,
    last_updated: Arc<AtomicU64>,
}

impl<C, S> TxPoolService<C, S>
where
    C: UtxoViewProvider,
    S: ScriptValidator,
{
    /// Create a new, empty pool.
    pub fn new(config: TxPoolConfig, chain: Arc<C>, scripts: Arc<S>) -> Self {
        let time_source: Box<dyn TimeSource> = Box::new(SystemTimeSource);
        let main = MainPool::new();
        let last_updated = main.last_updated_handle();
        let orphans = OrphanPool::new(&config, time_source.now());
        Self {
            chain,
            scripts,
            config,
            time_source,
            state: RwLock::new(PoolState { main, orphans }),
            last_updated,
        }
    }

    /// Replace the clock. The orphan expiry schedule restarts from the new
    /// clock's current time, so call this before using the pool.
    pub fn with_time_source(mut self, time_source: Box<dyn TimeSource>) -> Self {
        let now = time_source.now();
        self.time_source = time_source;
        self.state.get_mut().orphans = OrphanPool::new(&self.config, now);
        self
    }

    pub fn config(&self) -> &TxPoolConfig {
        &self.config
    }

    /// One admission attempt against locked state.
    fn maybe_accept(
        &self,
        state: &mut PoolState,
        tx: Arc<Transaction>,
        reject_duplicate_orphans: bool,
    ) -> Result<AdmissionOutcome, TxPoolError> {
        let hash = tx.hash();

        if state.main.contains(&hash)
            || (reject_duplicate_orphans && state.orphans.contains(&hash))
        {
            return Err(TxPoolError::AlreadyInPool(hash));
        }

        check_sanity(&tx, self.config.max_amount)?;
        state.main.check_double_spend(&tx)?;

        let mut view = self.fetch_input_utxos(&state.main, &tx)?;

        if view
            .lookup_entry(&hash)
            .is_some_and(|entry| !entry.is_fully_spent())
        {
            return Err(TxPoolError::AlreadyConfirmed(hash));
        }
        view.remove_entry(&hash);

        let mut missing: Vec<Hash> = view
            .entries()
            .iter()
            .filter(|(_, entry)| entry.as_ref().map_or(true, UtxoEntry::is_fully_spent))
            .map(|(source, _)| *source)
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Ok(AdmissionOutcome::MissingParents(missing));
        }

        let fee = check_inputs(&tx, &view, self.config.max_amount)?;
        self.scripts.validate_scripts(&tx, &view)?;

        let entry = state.main.add(tx, fee, self.time_source.now());
        metrics::record_accepted(1);
        debug!(
            tx_hash = %hex::encode(hash),
            fee,
            pool_size = state.main.len(),
            "Accepted transaction"
        );
        Ok(AdmissionOutcome::Accepted(entry))
    }

    /// Chain view for `tx`, with sources that are still in the pool filled in.
    fn fetch_input_utxos(&self, main: &MainPool, tx: &Transaction) -> Result<UtxoView, TxPoolError> {
        let mut view = self.chain.fetch_utxo_view(tx).map_err(|err| {
            warn!(tx_hash = %hex::encode(tx.hash()), error = %err, "Chain state lookup failed");
            err
        })?;

        let pooled: Vec<Arc<Transaction>> = view
            .entries()
            .iter()
            .filter(|(_, entry)| entry.as_ref().map_or(true, UtxoEntry::is_fully_spent))
            .filter_map(|(source, _)| main.get(source).map(|entry| Arc::clone(&entry.tx)))
            .collect();
        for source in pooled {
            view.add_tx_outs(&source, 0);
        }
        Ok(view)
    }

    /// Breadth-first promotion of orphans unblocked by `accepted`.
    fn process_orphans_locked(&self, state: &mut PoolState, accepted: Arc<Transaction>) -> Vec<TxEntry> {
        let mut promoted = Vec::new();
        let mut queue = VecDeque::from([accepted]);

        while let Some(parent) = queue.pop_front() {
            for outpoint in parent.output_points() {
                for orphan_hash in state.orphans.waiting_on(&outpoint) {
                    let Some(orphan) = state.orphans.get(&orphan_hash).map(|entry| Arc::clone(&entry.tx))
                    else {
                        continue;
                    };

                    match self.maybe_accept(state, orphan, false) {
                        Ok(AdmissionOutcome::MissingParents(_)) => continue,
                        Ok(AdmissionOutcome::Accepted(entry)) => {
                            state.orphans.remove(&orphan_hash, false);
                            debug!(tx_hash = %hex::encode(orphan_hash), "Promoted orphan transaction");
                            queue.push_back(Arc::clone(&entry.tx));
                            promoted.push(entry);
                            break;
                        }
                        Err(err) => {
                            let removed = state.orphans.remove(&orphan_hash, true);
                            debug!(
                                tx_hash = %hex::encode(orphan_hash),
                                error = %err,
                                removed = removed.len(),
                                "Dropped invalid orphan"
                            );
                            metrics::record_rejected(err.reason());
                            break;
                        }
                    }
                }
            }
        }

        metrics::record_orphans_promoted(promoted.len());
        promoted
    }

    fn store_orphan(&self, state: &mut PoolState, tx: Arc<Transaction>, now: Timestamp) {
        let hash = tx.hash();
        let OrphanEviction { expired, evicted } = state.orphans.add(tx, now);
        if !expired.is_empty() {
            info!(
                expired = expired.len(),
                remaining = state.orphans.len(),
                "Expired orphans"
            );
            metrics::record_orphans_expired(expired.len());
        }
        if let Some(victim) = evicted {
            debug!(tx_hash = %hex::encode(victim), "Evicted orphan to make room");
            metrics::record_orphan_evicted();
        }
        if state.orphans.contains(&hash) {
            metrics::record_orphan_stored();
        }
    }

    fn record_sizes(state: &PoolState) {
        metrics::record_pool_sizes(state.main.len(), state.orphans.len());
    }
}

impl<C, S> TxPoolApi for TxPoolService<C, S>
where
    C: UtxoViewProvider,
    S: ScriptValidator,
{
    fn process_transaction(
        &self,
        tx: Transaction,
        allow_orphan: bool,
    ) -> Result<Vec<TxEntry>, TxPoolError> {
        let tx = Arc::new(tx);
        let hash = tx.hash();
        debug!(tx_hash = %hex::encode(hash), allow_orphan, "Processing transaction");

        let mut state = self.state.write();
        let outcome = self
            .maybe_accept(&mut state, Arc::clone(&tx), true)
            .map_err(|err| {
                debug!(tx_hash = %hex::encode(hash), error = %err, "Rejected transaction");
                metrics::record_rejected(err.reason());
                err
            })?;

        match outcome {
            AdmissionOutcome::Accepted(entry) => {
                let promoted = self.process_orphans_locked(&mut state, Arc::clone(&entry.tx));

                let mut accepted = Vec::with_capacity(promoted.len() + 1);
                accepted.push(entry);
                accepted.extend(promoted);
                for entry in &accepted {
                    state.orphans.remove_double_spends(&entry.tx);
                }

                Self::record_sizes(&state);
                Ok(accepted)
            }
            AdmissionOutcome::MissingParents(missing) if allow_orphan => {
                debug!(
                    tx_hash = %hex::encode(hash),
                    missing = missing.len(),
                    "Transaction is an orphan"
                );
                let now = self.time_source.now();
                self.store_orphan(&mut state, tx, now);
                Self::record_sizes(&state);
                Ok(Vec::new())
            }
            AdmissionOutcome::MissingParents(missing) => {
                let err = TxPoolError::OrphanRejected {
                    tx: hash,
                    missing_parent: missing.into_iter().next().unwrap_or_default(),
                };
                metrics::record_rejected(err.reason());
                Err(err)
            }
        }
    }

    fn try_accept(
        &self,
        tx: Transaction,
        reject_duplicate_orphans: bool,
    ) -> Result<AdmissionOutcome, TxPoolError> {
        let mut state = self.state.write();
        let outcome = self
            .maybe_accept(&mut state, Arc::new(tx), reject_duplicate_orphans)
            .map_err(|err| {
                metrics::record_rejected(err.reason());
                err
            })?;
        Self::record_sizes(&state);
        Ok(outcome)
    }

    fn process_orphans(&self, accepted: &Transaction) -> Vec<TxEntry> {
        let mut state = self.state.write();
        let promoted = self.process_orphans_locked(&mut state, Arc::new(accepted.clone()));

        state.orphans.remove_double_spends(accepted);
        for entry in &promoted {
            state.orphans.remove_double_spends(&entry.tx);
        }
        Self::record_sizes(&state);
        promoted
    }

    fn is_transaction_in_pool(&self, hash: &Hash) -> bool {
        self.state.read().main.contains(hash)
    }

    fn is_orphan_in_pool(&self, hash: &Hash) -> bool {
        self.state.read().orphans.contains(hash)
    }

    fn have_transaction(&self, hash: &Hash) -> bool {
        let state = self.state.read();
        state.main.contains(hash) || state.orphans.contains(hash)
    }

    fn count(&self) -> usize {
        self.state.read().main.len()
    }

    fn orphan_count(&self) -> usize {
        self.state.read().orphans.len()
    }

    fn get_transaction(&self, hash: &Hash) -> Option<Arc<Transaction>> {
        self.state
            .read()
            .main
            .get(hash)
            .map(|entry| Arc::clone(&entry.tx))
    }

    fn tx_hashes(&self) -> Vec<Hash> {
        self.state.read().main.entries().map(TxEntry::hash).collect()
    }

    fn entries(&self) -> Vec<TxEntry> {
        self.state.read().main.entries().cloned().collect()
    }

    fn last_updated(&self) -> Timestamp {
        self.last_updated.load(Ordering::Acquire)
    }

    fn remove_transaction(&self, hash: &Hash, cascade: bool) -> Vec<Hash> {
        let mut state = self.state.write();
        let removed = state.main.remove(hash, cascade, self.time_source.now());
        if !removed.is_empty() {
            debug!(
                tx_hash = %hex::encode(hash),
                removed = removed.len(),
                pool_size = state.main.len(),
                "Removed transaction"
            );
        }
        Self::record_sizes(&state);
        removed
    }

    fn remove_double_spends(&self, tx: &Transaction) -> Vec<Hash> {
        let mut state = self.state.write();
        let removed = state.main.remove_double_spends(tx, self.time_source.now());
        if !removed.is_empty() {
            debug!(
                tx_hash = %hex::encode(tx.hash()),
                removed = removed.len(),
                "Removed double spends"
            );
        }
        Self::record_sizes(&state);
        removed
    }

    fn remove_orphan(&self, hash: &Hash, cascade: bool) -> Vec<Hash> {
        let mut state = self.state.write();
        let removed = state.orphans.remove(hash, cascade);
        Self::record_sizes(&state);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{AcceptAllScripts, InMemoryChainState};
    use crate::domain::{InputError, OutPoint, ScriptError, TxIn, TxOut};
    use crate::ports::{MockTimeSource, RejectingScripts};

    // =========================================================================
    // TEST HELPERS
    // =========================================================================

    type TestPool = TxPoolService<InMemoryChainState, AcceptAllScripts>;

    fn create_tx(inputs: &[OutPoint], values: &[i64]) -> Transaction {
        Transaction::new(
            inputs.iter().copied().map(TxIn::new).collect(),
            values.iter().copied().map(TxOut::new).collect(),
        )
    }

    /// Confirmed funding transaction paying `values`.
    fn fund(chain: &InMemoryChainState, seed: u8, values: &[i64]) -> Transaction {
        let tx = create_tx(&[OutPoint::new([seed; 32], 0)], values);
        chain.connect_transaction(&tx);
        tx
    }

    fn setup() -> (TestPool, Arc<InMemoryChainState>, Arc<MockTimeSource>) {
        let chain = Arc::new(InMemoryChainState::new());
        let clock = Arc::new(MockTimeSource::new(1_000));
        let pool = TxPoolService::new(
            TxPoolConfig::for_testing(),
            Arc::clone(&chain),
            Arc::new(AcceptAllScripts),
        )
        .with_time_source(Box::new(Arc::clone(&clock)));
        (pool, chain, clock)
    }

    // =========================================================================
    // ADMISSION TESTS
    // =========================================================================

    #[test]
    fn test_try_accept_reports_fee() {
        let (pool, chain, _) = setup();
        let funding = fund(&chain, 1, &[600, 400]);
        let tx = create_tx(
            &[OutPoint::new(funding.hash(), 0), OutPoint::new(funding.hash(), 1)],
            &[900, 50],
        );

        let outcome = pool.try_accept(tx.clone(), true).unwrap();
        assert_eq!(outcome.fee(), Some(50));
        assert!(pool.is_transaction_in_pool(&tx.hash()));
    }

    #[test]
    fn test_try_accept_insufficient_input() {
        let (pool, chain, _) = setup();
        let funding = fund(&chain, 1, &[1000]);
        let tx = create_tx(&[OutPoint::new(funding.hash(), 0)], &[1001]);

        assert!(matches!(
            pool.try_accept(tx, true),
            Err(TxPoolError::Input(InputError::InsufficientInput { .. }))
        ));
        assert_eq!(pool.count(), 0);
    }

    #[test]
    fn test_try_accept_does_not_store_orphans() {
        let (pool, _, _) = setup();
        let tx = create_tx(&[OutPoint::new([9; 32], 0)], &[1]);

        let outcome = pool.try_accept(tx.clone(), true).unwrap();
        assert!(matches!(outcome, AdmissionOutcome::MissingParents(ref m) if m == &vec![[9; 32]]));
        assert!(!pool.have_transaction(&tx.hash()));
    }

    #[test]
    fn test_duplicate_rejected() {
        let (pool, chain, _) = setup();
        let funding = fund(&chain, 1, &[100]);
        let tx = create_tx(&[OutPoint::new(funding.hash(), 0)], &[90]);

        pool.process_transaction(tx.clone(), false).unwrap();
        assert!(matches!(
            pool.process_transaction(tx, false),
            Err(TxPoolError::AlreadyInPool(_))
        ));
    }

    #[test]
    fn test_duplicate_orphan_rejected_only_when_asked() {
        let (pool, _, _) = setup();
        let orphan = create_tx(&[OutPoint::new([9; 32], 0)], &[1]);
        pool.process_transaction(orphan.clone(), true).unwrap();

        assert!(matches!(
            pool.try_accept(orphan.clone(), true),
            Err(TxPoolError::AlreadyInPool(_))
        ));
        assert!(matches!(
            pool.try_accept(orphan, false),
            Ok(AdmissionOutcome::MissingParents(_))
        ));
    }

    #[test]
    fn test_sanity_failure_propagates() {
        let (pool, _, _) = setup();
        let tx = create_tx(&[], &[1]);
        assert!(matches!(
            pool.process_transaction(tx, true),
            Err(TxPoolError::Sanity(_))
        ));
        assert_eq!(pool.orphan_count(), 0);
    }

    #[test]
    fn test_already_confirmed() {
        let (pool, chain, _) = setup();
        let confirmed = fund(&chain, 1, &[100]);
        assert!(matches!(
            pool.process_transaction(confirmed, true),
            Err(TxPoolError::AlreadyConfirmed(_))
        ));
    }

    #[test]
    fn test_spent_chain_output_is_missing_parent() {
        let (pool, chain, _) = setup();
        let funding = fund(&chain, 1, &[100]);
        chain.spend_output(&funding.hash(), 0);

        let tx = create_tx(&[OutPoint::new(funding.hash(), 0)], &[90]);
        assert!(matches!(
            pool.process_transaction(tx, false),
            Err(TxPoolError::OrphanRejected { missing_parent, .. }) if missing_parent == funding.hash()
        ));
    }

    #[test]
    fn test_chained_spend_of_pool_output() {
        let (pool, chain, _) = setup();
        let funding = fund(&chain, 1, &[100]);
        let parent = create_tx(&[OutPoint::new(funding.hash(), 0)], &[90]);
        let child = create_tx(&[OutPoint::new(parent.hash(), 0)], &[80]);

        pool.process_transaction(parent, false).unwrap();
        let accepted = pool.process_transaction(child.clone(), false).unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].fee, 10);
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn test_script_failure() {
        let chain = Arc::new(InMemoryChainState::new());
        let pool = TxPoolService::new(
            TxPoolConfig::for_testing(),
            Arc::clone(&chain),
            Arc::new(RejectingScripts),
        );
        let funding = fund(&chain, 1, &[100]);
        let tx = create_tx(&[OutPoint::new(funding.hash(), 0)], &[90]);

        assert!(matches!(
            pool.process_transaction(tx, true),
            Err(TxPoolError::Script(ScriptError::VerificationFailed { .. }))
        ));
        assert_eq!(pool.count(), 0);
    }

    #[test]
    fn test_chain_state_failure() {
        let (pool, chain, _) = setup();
        let funding = fund(&chain, 1, &[100]);
        chain.set_unavailable(true);
        let tx = create_tx(&[OutPoint::new(funding.hash(), 0)], &[90]);

        assert!(matches!(
            pool.process_transaction(tx, true),
            Err(TxPoolError::ChainState(_))
        ));
        assert_eq!(pool.orphan_count(), 0);
    }

    // =========================================================================
    // ORPHAN TESTS
    // =========================================================================

    #[test]
    fn test_orphan_rejected_when_not_allowed() {
        let (pool, _, _) = setup();
        let tx = create_tx(&[OutPoint::new([9; 32], 0)], &[1]);
        assert!(matches!(
            pool.process_transaction(tx.clone(), false),
            Err(TxPoolError::OrphanRejected { missing_parent, .. }) if missing_parent == [9; 32]
        ));
        assert!(!pool.have_transaction(&tx.hash()));
    }

    #[test]
    fn test_invalid_orphan_dropped_on_promotion() {
        let (pool, chain, _) = setup();
        let funding = fund(&chain, 1, &[100]);
        let parent = create_tx(&[OutPoint::new(funding.hash(), 0)], &[90]);
        // Overspends its parent; fails once the parent is known.
        let bad = create_tx(&[OutPoint::new(parent.hash(), 0)], &[95]);
        let bad_child = create_tx(&[OutPoint::new(bad.hash(), 0)], &[1]);

        pool.process_transaction(bad.clone(), true).unwrap();
        pool.process_transaction(bad_child.clone(), true).unwrap();
        assert_eq!(pool.orphan_count(), 2);

        let accepted = pool.process_transaction(parent, true).unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(pool.orphan_count(), 0);
        assert!(!pool.have_transaction(&bad.hash()));
        assert!(!pool.have_transaction(&bad_child.hash()));
    }

    #[test]
    fn test_process_orphans_after_confirmation() {
        let (pool, chain, _) = setup();
        let parent = create_tx(&[OutPoint::new([1; 32], 0)], &[100]);
        let orphan = create_tx(&[OutPoint::new(parent.hash(), 0)], &[90]);
        pool.process_transaction(orphan.clone(), true).unwrap();

        chain.connect_transaction(&parent);
        let promoted = pool.process_orphans(&parent);
        assert_eq!(promoted.len(), 1);
        assert_eq!(promoted[0].hash(), orphan.hash());
        assert!(pool.is_transaction_in_pool(&orphan.hash()));
        assert!(!pool.is_orphan_in_pool(&orphan.hash()));
    }

    #[test]
    fn test_process_orphans_drops_mined_orphan() {
        let (pool, chain, _) = setup();
        let parent = create_tx(&[OutPoint::new([1; 32], 0)], &[100]);
        let orphan = create_tx(&[OutPoint::new(parent.hash(), 0)], &[90]);
        pool.process_transaction(orphan.clone(), true).unwrap();
        assert!(pool.is_orphan_in_pool(&orphan.hash()));

        // Both confirmed in a block before the parent ever reached the pool.
        chain.connect_transaction(&parent);
        chain.connect_transaction(&orphan);
        let promoted = pool.process_orphans(&orphan);

        assert!(promoted.is_empty());
        assert!(!pool.is_orphan_in_pool(&orphan.hash()));
        assert!(!pool.have_transaction(&orphan.hash()));
        assert_eq!(pool.orphan_count(), 0);
    }

    #[test]
    fn test_orphan_count_bounded_by_config() {
        let (pool, _, _) = setup();
        let max = pool.config().max_orphan_txs;
        for seed in 0..(max as u8 + 2) {
            let orphan = create_tx(&[OutPoint::new([seed + 10; 32], 0)], &[1]);
            pool.process_transaction(orphan, true).unwrap();
        }
        assert_eq!(pool.orphan_count(), max);
    }

    #[test]
    fn test_accepted_tx_purges_conflicting_orphans() {
        let (pool, chain, _) = setup();
        let funding = fund(&chain, 1, &[100]);
        // Waits on an unknown parent and also spends the funding output.
        let conflicting = create_tx(
            &[OutPoint::new([9; 32], 0), OutPoint::new(funding.hash(), 0)],
            &[1],
        );
        pool.process_transaction(conflicting.clone(), true).unwrap();
        assert!(pool.is_orphan_in_pool(&conflicting.hash()));

        let spender = create_tx(&[OutPoint::new(funding.hash(), 0)], &[90]);
        pool.process_transaction(spender, false).unwrap();
        assert!(!pool.is_orphan_in_pool(&conflicting.hash()));
    }

    // =========================================================================
    // FRESHNESS TESTS
    // =========================================================================

    #[test]
    fn test_last_updated_tracks_mutations() {
        let (pool, chain, clock) = setup();
        assert_eq!(pool.last_updated(), 0);

        let funding = fund(&chain, 1, &[100]);
        let tx = create_tx(&[OutPoint::new(funding.hash(), 0)], &[90]);
        clock.set(5_000);
        pool.process_transaction(tx.clone(), false).unwrap();
        assert_eq!(pool.last_updated(), 5_000);

        clock.set(6_000);
        pool.remove_transaction(&[7; 32], true);
        assert_eq!(pool.last_updated(), 5_000);

        pool.remove_transaction(&tx.hash(), true);
        assert_eq!(pool.last_updated(), 6_000);
    }
}
