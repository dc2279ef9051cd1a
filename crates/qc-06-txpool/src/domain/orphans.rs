//! Orphan pool index.
//!
//! Holds transactions that failed admission only because some parent was
//! not yet visible. The store owns orphans by hash; the waiting index maps
//! each referenced output to the hashes of orphans spending it, so there are
//! no back-pointers between entries.
//!
//! ## Eviction
//!
//! | Trigger | Victim | Redeemers |
//! |---------|--------|-----------|
//! | TTL expiry (scan-gated) | every expired orphan | removed |
//! | Capacity | one random orphan | kept |
//! | Double-spend | orphans waiting on a claimed output | removed |

use super::entities::{Hash, OrphanEntry, OutPoint, Timestamp, Transaction, TxPoolConfig};
use rand::seq::IteratorRandom;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// What one call to [`OrphanPool::limit_orphans`] removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrphanEviction {
    /// Expired orphans and their redeemers.
    pub expired: Vec<Hash>,
    /// Orphan dropped to make room, if any.
    pub evicted: Option<Hash>,
}

#[derive(Debug)]
pub struct OrphanPool {
    max_orphans: usize,
    ttl_ms: u64,
    scan_interval_ms: u64,

    orphans: HashMap<Hash, OrphanEntry>,

    /// Referenced output -> orphans spending it.
    orphans_by_prev: HashMap<OutPoint, HashSet<Hash>>,

    /// Earliest time the next expiry scan may run.
    next_expire_scan: Timestamp,
}

impl OrphanPool {
    pub fn new(config: &TxPoolConfig, now: Timestamp) -> Self {
        Self {
            max_orphans: config.max_orphan_txs,
            ttl_ms: config.orphan_ttl_ms,
            scan_interval_ms: config.orphan_expire_scan_interval_ms,
            orphans: HashMap::new(),
            orphans_by_prev: HashMap::new(),
            next_expire_scan: now.saturating_add(config.orphan_expire_scan_interval_ms),
        }
    }

    pub fn len(&self) -> usize {
        self.orphans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orphans.is_empty()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.orphans.contains_key(hash)
    }

    pub fn get(&self, hash: &Hash) -> Option<&OrphanEntry> {
        self.orphans.get(hash)
    }

    /// Hashes of orphans spending `outpoint`, sorted.
    pub fn waiting_on(&self, outpoint: &OutPoint) -> Vec<Hash> {
        let Some(waiting) = self.orphans_by_prev.get(outpoint) else {
            return Vec::new();
        };
        let mut hashes: Vec<Hash> = waiting.iter().copied().collect();
        debug_assert!(
            hashes.iter().all(|hash| self.orphans.contains_key(hash)),
            "waiting index references a missing orphan"
        );
        hashes.sort_unstable();
        hashes
    }

    /// Stores `tx` as an orphan after running eviction. A no-op when the
    /// pool is configured with zero capacity.
    pub fn add(&mut self, tx: Arc<Transaction>, now: Timestamp) -> OrphanEviction {
        if self.max_orphans == 0 {
            return OrphanEviction::default();
        }
        let eviction = self.limit_orphans(now);

        let hash = tx.hash();
        if self.contains(&hash) {
            self.remove(&hash, false);
        }
        for input in tx.inputs() {
            self.orphans_by_prev
                .entry(input.previous_output)
                .or_default()
                .insert(hash);
        }
        self.orphans
            .insert(hash, OrphanEntry::new(tx, now.saturating_add(self.ttl_ms)));

        debug!(
            tx_hash = %hex::encode(hash),
            orphan_count = self.orphans.len(),
            "Stored orphan transaction"
        );
        eviction
    }

    /// Removes `hash`, and with `cascade` every orphan redeeming its
    /// outputs. Returns removed hashes; absent hashes are a no-op.
    pub fn remove(&mut self, hash: &Hash, cascade: bool) -> Vec<Hash> {
        let mut removed = Vec::new();
        let mut work = vec![*hash];

        while let Some(current) = work.pop() {
            let Some(entry) = self.orphans.remove(&current) else {
                continue;
            };
            for input in entry.tx.inputs() {
                self.unregister(&input.previous_output, &current);
            }
            if cascade {
                for outpoint in entry.tx.output_points() {
                    if let Some(redeemers) = self.orphans_by_prev.get(&outpoint) {
                        work.extend(redeemers.iter().copied());
                    }
                }
            }
            removed.push(current);
        }
        removed
    }

    /// Expires stale orphans when a scan is due, then frees one slot if
    /// the pool is full.
    pub fn limit_orphans(&mut self, now: Timestamp) -> OrphanEviction {
        let mut eviction = OrphanEviction::default();

        if now > self.next_expire_scan {
            let stale: Vec<Hash> = self
                .orphans
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(hash, _)| *hash)
                .collect();
            for hash in stale {
                eviction.expired.extend(self.remove(&hash, true));
            }
            self.next_expire_scan = now.saturating_add(self.scan_interval_ms);

            if !eviction.expired.is_empty() {
                debug!(
                    expired = eviction.expired.len(),
                    remaining = self.orphans.len(),
                    "Expired orphans"
                );
            }
        }

        if self.orphans.len() + 1 > self.max_orphans {
            let victim = self.orphans.keys().copied().choose(&mut rand::thread_rng());
            if let Some(victim) = victim {
                self.remove(&victim, false);
                eviction.evicted = Some(victim);
            }
        }
        eviction
    }

    /// Cascade-removes every orphan spending one of `tx`'s inputs,
    /// including `tx` itself when it is stored as an orphan.
    pub fn remove_double_spends(&mut self, tx: &Transaction) -> Vec<Hash> {
        let mut removed = Vec::new();
        for input in tx.inputs() {
            for conflict in self.waiting_on(&input.previous_output) {
                removed.extend(self.remove(&conflict, true));
            }
        }
        removed
    }

    fn unregister(&mut self, outpoint: &OutPoint, hash: &Hash) {
        if let Some(waiting) = self.orphans_by_prev.get_mut(outpoint) {
            waiting.remove(hash);
            if waiting.is_empty() {
                self.orphans_by_prev.remove(outpoint);
            }
        }
    }

    #[cfg(test)]
    fn waiting_index_len(&self) -> usize {
        self.orphans_by_prev.len()
    }
}
