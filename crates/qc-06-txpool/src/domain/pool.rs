//! Main pool index.
//!
//! Accepted transactions keyed by hash, plus a spend index mapping each
//! claimed output reference to the pool transaction claiming it.
//!
//! INVARIANTS:
//! - At most one pool transaction claims any output reference.
//! - Every input of every pooled transaction is present in the spend index.

use super::entities::{Hash, OutPoint, Timestamp, Transaction, TxEntry};
use super::errors::TxPoolError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct MainPool {
    /// All accepted transactions indexed by hash.
    pool: HashMap<Hash, TxEntry>,

    /// Output reference -> hash of the pool transaction spending it.
    outpoints: HashMap<OutPoint, Hash>,

    /// Time of the last structural change, shared with lock-free readers.
    last_updated: Arc<AtomicU64>,
}

impl Default for MainPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MainPool {
    pub fn new() -> Self {
        Self {
            pool: HashMap::new(),
            outpoints: HashMap::new(),
            last_updated: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.pool.contains_key(hash)
    }

    pub fn get(&self, hash: &Hash) -> Option<&TxEntry> {
        self.pool.get(hash)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TxEntry> {
        self.pool.values()
    }

    /// Hash of the pool transaction spending `outpoint`, if any.
    pub fn spender_of(&self, outpoint: &OutPoint) -> Option<Hash> {
        self.outpoints.get(outpoint).copied()
    }

    /// Handle to the last-updated timestamp for lock-free reads.
    pub fn last_updated_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.last_updated)
    }

    pub fn last_updated(&self) -> Timestamp {
        self.last_updated.load(Ordering::Acquire)
    }

    /// Fails if any input of `tx` is already claimed by a pool transaction.
    pub fn check_double_spend(&self, tx: &Transaction) -> Result<(), TxPoolError> {
        for input in tx.inputs() {
            if let Some(spent_by) = self.spender_of(&input.previous_output) {
                return Err(TxPoolError::PoolDoubleSpend {
                    outpoint: input.previous_output,
                    spent_by,
                });
            }
        }
        Ok(())
    }

    /// Inserts an already validated transaction and claims its inputs.
    pub fn add(&mut self, tx: Arc<Transaction>, fee: i64, now: Timestamp) -> TxEntry {
        let hash = tx.hash();
        for input in tx.inputs() {
            self.outpoints.insert(input.previous_output, hash);
        }
        let entry = TxEntry::new(tx, now, fee);
        self.pool.insert(hash, entry.clone());
        self.touch(now);
        entry
    }

    /// Removes `hash`, and with `cascade` every pool transaction that
    /// spends its outputs, redeemers first. Returns removed hashes in
    /// removal order; absent hashes are a no-op.
    pub fn remove(&mut self, hash: &Hash, cascade: bool, now: Timestamp) -> Vec<Hash> {
        let mut removed = Vec::new();
        // (hash, redeemers already queued)
        let mut stack = vec![(*hash, false)];

        while let Some((current, expanded)) = stack.pop() {
            if expanded || !cascade {
                if self.remove_single(&current) {
                    removed.push(current);
                }
                continue;
            }

            let Some(entry) = self.pool.get(&current) else {
                continue;
            };
            stack.push((current, true));
            for outpoint in entry.tx.output_points() {
                if let Some(redeemer) = self.outpoints.get(&outpoint) {
                    stack.push((*redeemer, false));
                }
            }
        }

        if !removed.is_empty() {
            self.touch(now);
        }
        removed
    }

    /// Evicts every pool transaction (other than `tx`) claiming one of
    /// `tx`'s inputs, together with its redeemers.
    pub fn remove_double_spends(&mut self, tx: &Transaction, now: Timestamp) -> Vec<Hash> {
        let hash = tx.hash();
        let mut removed = Vec::new();
        for input in tx.inputs() {
            if let Some(spender) = self.spender_of(&input.previous_output) {
                if spender != hash {
                    removed.extend(self.remove(&spender, true, now));
                }
            }
        }
        removed
    }

    fn remove_single(&mut self, hash: &Hash) -> bool {
        let Some(entry) = self.pool.remove(hash) else {
            return false;
        };
        for input in entry.tx.inputs() {
            if self.outpoints.get(&input.previous_output) == Some(hash) {
                self.outpoints.remove(&input.previous_output);
            }
        }
        true
    }

    fn touch(&self, now: Timestamp) {
        self.last_updated.store(now, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{TxIn, TxOut};

    // =========================================================================
    // TEST HELPERS
    // =========================================================================

    fn create_tx(inputs: &[OutPoint], outputs: usize) -> Arc<Transaction> {
        Arc::new(Transaction::new(
            inputs.iter().copied().map(TxIn::new).collect(),
            (0..outputs).map(|i| TxOut::new(100 + i as i64)).collect(),
        ))
    }

    fn spend(parent: &Transaction, index: u32) -> OutPoint {
        OutPoint::new(parent.hash(), index)
    }

    // =========================================================================
    // ADD / QUERY TESTS
    // =========================================================================

    #[test]
    fn test_add_registers_spends() {
        let mut pool = MainPool::new();
        let funding = OutPoint::new([1; 32], 0);
        let tx = create_tx(&[funding], 1);

        let entry = pool.add(Arc::clone(&tx), 25, 1_000);
        assert_eq!(entry.fee, 25);
        assert_eq!(entry.added_at, 1_000);
        assert!(pool.contains(&tx.hash()));
        assert_eq!(pool.spender_of(&funding), Some(tx.hash()));
        assert_eq!(pool.last_updated(), 1_000);
    }

    #[test]
    fn test_check_double_spend() {
        let mut pool = MainPool::new();
        let funding = OutPoint::new([1; 32], 0);
        let first = create_tx(&[funding], 1);
        pool.add(Arc::clone(&first), 0, 1);

        let second = create_tx(&[funding], 2);
        assert!(matches!(
            pool.check_double_spend(&second),
            Err(TxPoolError::PoolDoubleSpend { spent_by, .. }) if spent_by == first.hash()
        ));
    }

    // =========================================================================
    // REMOVAL TESTS
    // =========================================================================

    #[test]
    fn test_remove_without_cascade_keeps_redeemers() {
        let mut pool = MainPool::new();
        let parent = create_tx(&[OutPoint::new([1; 32], 0)], 1);
        let child = create_tx(&[spend(&parent, 0)], 1);
        pool.add(Arc::clone(&parent), 0, 1);
        pool.add(Arc::clone(&child), 0, 2);

        let removed = pool.remove(&parent.hash(), false, 3);
        assert_eq!(removed, vec![parent.hash()]);
        assert!(pool.contains(&child.hash()));
        assert_eq!(pool.spender_of(&OutPoint::new([1; 32], 0)), None);
    }

    #[test]
    fn test_remove_cascade_removes_redeemers_first() {
        let mut pool = MainPool::new();
        let parent = create_tx(&[OutPoint::new([1; 32], 0)], 2);
        let child_a = create_tx(&[spend(&parent, 0)], 1);
        let child_b = create_tx(&[spend(&parent, 1)], 1);
        let grandchild = create_tx(&[spend(&child_a, 0)], 1);
        let unrelated = create_tx(&[OutPoint::new([2; 32], 0)], 1);
        for tx in [&parent, &child_a, &child_b, &grandchild, &unrelated] {
            pool.add(Arc::clone(tx), 0, 1);
        }

        let removed = pool.remove(&parent.hash(), true, 5);
        assert_eq!(removed.len(), 4);
        assert_eq!(removed.last(), Some(&parent.hash()));
        let pos = |h: Hash| removed.iter().position(|r| *r == h).unwrap();
        assert!(pos(grandchild.hash()) < pos(child_a.hash()));

        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&unrelated.hash()));
        assert_eq!(pool.last_updated(), 5);
    }

    #[test]
    fn test_remove_cascade_redeemer_spending_two_outputs() {
        let mut pool = MainPool::new();
        let parent = create_tx(&[OutPoint::new([1; 32], 0)], 2);
        let child = create_tx(&[spend(&parent, 0), spend(&parent, 1)], 1);
        pool.add(Arc::clone(&parent), 0, 1);
        pool.add(Arc::clone(&child), 0, 1);

        let removed = pool.remove(&parent.hash(), true, 2);
        assert_eq!(removed, vec![child.hash(), parent.hash()]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_remove_deep_chain_is_iterative() {
        let mut pool = MainPool::new();
        let root = create_tx(&[OutPoint::new([1; 32], 0)], 1);
        pool.add(Arc::clone(&root), 0, 1);
        let mut tip = Arc::clone(&root);
        for _ in 0..20_000 {
            let next = create_tx(&[spend(&tip, 0)], 1);
            pool.add(Arc::clone(&next), 0, 1);
            tip = next;
        }

        let removed = pool.remove(&root.hash(), true, 2);
        assert_eq!(removed.len(), 20_001);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut pool = MainPool::new();
        assert!(pool.remove(&[9; 32], true, 7).is_empty());
        assert_eq!(pool.last_updated(), 0);
    }

    #[test]
    fn test_remove_double_spends() {
        let mut pool = MainPool::new();
        let funding = OutPoint::new([1; 32], 0);
        let occupant = create_tx(&[funding], 1);
        let dependent = create_tx(&[spend(&occupant, 0)], 1);
        pool.add(Arc::clone(&occupant), 0, 1);
        pool.add(Arc::clone(&dependent), 0, 1);

        let replacement = create_tx(&[funding], 3);
        let removed = pool.remove_double_spends(&replacement, 2);
        assert_eq!(removed.len(), 2);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_remove_double_spends_ignores_self() {
        let mut pool = MainPool::new();
        let tx = create_tx(&[OutPoint::new([1; 32], 0)], 1);
        pool.add(Arc::clone(&tx), 0, 1);

        assert!(pool.remove_double_spends(&tx, 2).is_empty());
        assert!(pool.contains(&tx.hash()));
    }
}
