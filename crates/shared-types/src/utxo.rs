//! # UTXO Viewpoint
//!
//! A point-in-time snapshot of the unspent outputs a transaction references.
//! Entries are keyed by the hash of the transaction that created the
//! outputs; a `None` entry records that the source was looked up and not
//! found.

use crate::entities::{Hash, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single output tracked by a [`UtxoEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoOutput {
    pub amount: i64,
    pub spent: bool,
}

/// Unspent outputs of one transaction.
///
/// Outputs are sparse: pruned indices are simply absent and count as spent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UtxoEntry {
    version: u32,
    block_height: u64,
    outputs: HashMap<u32, UtxoOutput>,
}

impl UtxoEntry {
    pub fn new(version: u32, block_height: u64) -> Self {
        Self {
            version,
            block_height,
            outputs: HashMap::new(),
        }
    }

    /// Entry holding every output of `tx`, all unspent.
    pub fn from_transaction(tx: &Transaction, block_height: u64) -> Self {
        let mut entry = Self::new(tx.version(), block_height);
        for (index, output) in tx.outputs().iter().enumerate() {
            entry.add_output(index as u32, output.value);
        }
        entry
    }

    /// Adds (or resets) an unspent output.
    pub fn add_output(&mut self, index: u32, amount: i64) {
        self.outputs.insert(index, UtxoOutput { amount, spent: false });
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    pub fn is_output_spent(&self, index: u32) -> bool {
        self.outputs.get(&index).map_or(true, |output| output.spent)
    }

    pub fn is_fully_spent(&self) -> bool {
        self.outputs.values().all(|output| output.spent)
    }

    /// Amount at `index`, or 0 when the output is unknown.
    pub fn amount_by_index(&self, index: u32) -> i64 {
        self.outputs.get(&index).map_or(0, |output| output.amount)
    }

    /// Marks an output spent. Unknown indices are ignored.
    pub fn spend_output(&mut self, index: u32) {
        if let Some(output) = self.outputs.get_mut(&index) {
            output.spent = true;
        }
    }

    pub fn unspend_output(&mut self, index: u32) {
        if let Some(output) = self.outputs.get_mut(&index) {
            output.spent = false;
        }
    }
}

/// Snapshot of the chain-state entries a transaction depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoView {
    entries: HashMap<Hash, Option<UtxoEntry>>,
}

impl UtxoView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &HashMap<Hash, Option<UtxoEntry>> {
        &self.entries
    }

    /// The entry for `hash`, if present and known.
    pub fn lookup_entry(&self, hash: &Hash) -> Option<&UtxoEntry> {
        self.entries.get(hash).and_then(Option::as_ref)
    }

    pub fn insert_entry(&mut self, hash: Hash, entry: Option<UtxoEntry>) {
        self.entries.insert(hash, entry);
    }

    pub fn remove_entry(&mut self, hash: &Hash) -> Option<Option<UtxoEntry>> {
        self.entries.remove(hash)
    }

    /// Makes every output of `tx` available as unspent.
    ///
    /// An existing entry keeps its spent flags for indices `tx` does not
    /// create, matching how a partially pruned entry is refreshed.
    pub fn add_tx_outs(&mut self, tx: &Transaction, block_height: u64) {
        let slot = self.entries.entry(tx.hash()).or_insert(None);
        let entry = slot.get_or_insert_with(|| UtxoEntry::new(tx.version(), block_height));
        entry.version = tx.version();
        entry.block_height = block_height;
        for (index, output) in tx.outputs().iter().enumerate() {
            entry.add_output(index as u32, output.value);
        }
    }
}
