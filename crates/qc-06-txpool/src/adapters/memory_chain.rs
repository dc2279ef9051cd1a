use crate::domain::{ChainStateError, Hash, Transaction, UtxoEntry, UtxoView};
use crate::ports::UtxoViewProvider;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory confirmed UTXO set implementing [`UtxoViewProvider`].
///
/// Used by tests and by embeddings without a persistent chain state.
#[derive(Debug, Default)]
pub struct InMemoryChainState {
    entries: RwLock<HashMap<Hash, UtxoEntry>>,
    height: RwLock<u64>,
    unavailable: AtomicBool,
}

impl InMemoryChainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `tx` as confirmed at the next height: its outputs become
    /// spendable and the outputs it spends are marked spent.
    pub fn connect_transaction(&self, tx: &Transaction) {
        let height = {
            let mut height = self.height.write();
            *height += 1;
            *height
        };

        let mut entries = self.entries.write();
        for input in tx.inputs() {
            if let Some(entry) = entries.get_mut(&input.previous_output.hash) {
                entry.spend_output(input.previous_output.index);
            }
        }
        entries.insert(tx.hash(), UtxoEntry::from_transaction(tx, height));
    }

    /// Inserts or replaces a raw entry.
    pub fn insert_entry(&self, hash: Hash, entry: UtxoEntry) {
        self.entries.write().insert(hash, entry);
    }

    pub fn spend_output(&self, hash: &Hash, index: u32) {
        if let Some(entry) = self.entries.write().get_mut(hash) {
            entry.spend_output(index);
        }
    }

    /// Makes every subsequent fetch fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl UtxoViewProvider for InMemoryChainState {
    fn fetch_utxo_view(&self, tx: &Transaction) -> Result<UtxoView, ChainStateError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ChainStateError::Unavailable("in-memory chain state disabled".into()));
        }

        let entries = self.entries.read();
        let mut view = UtxoView::new();
        for input in tx.inputs() {
            let source = input.previous_output.hash;
            view.insert_entry(source, entries.get(&source).cloned());
        }
        if let Some(own) = entries.get(&tx.hash()) {
            view.insert_entry(tx.hash(), Some(own.clone()));
        }
        Ok(view)
    }
}
