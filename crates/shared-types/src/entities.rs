//! # Core Domain Entities
//!
//! UTXO transaction model consumed by the transaction pool.
//!
//! ## Identity
//!
//! A [`Transaction`] is identified by the double SHA-256 of its canonical
//! encoding. The hash is computed once when the transaction is built and
//! cached, so the pool can key every index by it without rehashing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte transaction hash.
pub type Hash = [u8; 32];

/// The all-zero hash.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Base units per coin.
pub const UNITS_PER_COIN: i64 = 100_000_000;

/// Fixed-supply ceiling for any single amount or running total.
pub const MAX_AMOUNT: i64 = 21_000_000 * UNITS_PER_COIN;

// =============================================================================
// OUTPUT REFERENCES
// =============================================================================

/// Reference to a previous transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    /// Hash of the transaction holding the output.
    pub hash: Hash,
    /// Output index within that transaction.
    pub index: u32,
}

impl OutPoint {
    pub const fn new(hash: Hash, index: u32) -> Self {
        Self { hash, index }
    }

    /// The sentinel reference used by coinbase inputs. Never a valid spend.
    pub const fn null() -> Self {
        Self {
            hash: ZERO_HASH,
            index: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.index == u32::MAX && self.hash == ZERO_HASH
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.hash), self.index)
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// A transaction input spending a previous output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub previous_output: OutPoint,
    /// Authorization data checked by the script validator.
    pub signature_script: Vec<u8>,
}

impl TxIn {
    pub fn new(previous_output: OutPoint) -> Self {
        Self {
            previous_output,
            signature_script: Vec::new(),
        }
    }
}

/// A transaction output.
///
/// `value` is signed so that malformed negative values survive decoding and
/// are rejected by validation instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: i64,
    pub pk_script: Vec<u8>,
}

impl TxOut {
    pub fn new(value: i64) -> Self {
        Self {
            value,
            pk_script: Vec::new(),
        }
    }
}

/// Plain field mirror of [`Transaction`] used for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TransactionData {
    version: u32,
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
    lock_time: u32,
}

/// An immutable transaction with a cached content hash.
///
/// Equality compares hashes, which cover every field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "TransactionData", into = "TransactionData")]
pub struct Transaction {
    version: u32,
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
    lock_time: u32,
    hash: Hash,
}

impl Transaction {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        Self::with_version(Self::CURRENT_VERSION, inputs, outputs, 0)
    }

    pub fn with_version(version: u32, inputs: Vec<TxIn>, outputs: Vec<TxOut>, lock_time: u32) -> Self {
        let hash = compute_hash(version, &inputs, &outputs, lock_time);
        Self {
            version,
            inputs,
            outputs,
            lock_time,
            hash,
        }
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn inputs(&self) -> &[TxIn] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOut] {
        &self.outputs
    }

    pub fn lock_time(&self) -> u32 {
        self.lock_time
    }

    /// References to every output this transaction creates.
    pub fn output_points(&self) -> impl Iterator<Item = OutPoint> + '_ {
        (0..self.outputs.len() as u32).map(move |index| OutPoint::new(self.hash, index))
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Transaction {}

impl From<TransactionData> for Transaction {
    fn from(data: TransactionData) -> Self {
        Self::with_version(data.version, data.inputs, data.outputs, data.lock_time)
    }
}

impl From<Transaction> for TransactionData {
    fn from(tx: Transaction) -> Self {
        Self {
            version: tx.version,
            inputs: tx.inputs,
            outputs: tx.outputs,
            lock_time: tx.lock_time,
        }
    }
}

/// Double SHA-256 over a little-endian, length-prefixed encoding.
fn compute_hash(version: u32, inputs: &[TxIn], outputs: &[TxOut], lock_time: u32) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(version.to_le_bytes());

    hasher.update((inputs.len() as u64).to_le_bytes());
    for input in inputs {
        hasher.update(input.previous_output.hash);
        hasher.update(input.previous_output.index.to_le_bytes());
        hasher.update((input.signature_script.len() as u64).to_le_bytes());
        hasher.update(&input.signature_script);
    }

    hasher.update((outputs.len() as u64).to_le_bytes());
    for output in outputs {
        hasher.update(output.value.to_le_bytes());
        hasher.update((output.pk_script.len() as u64).to_le_bytes());
        hasher.update(&output.pk_script);
    }

    hasher.update(lock_time.to_le_bytes());

    let first = hasher.finalize();
    Sha256::digest(first).into()
}
