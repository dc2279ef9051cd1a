//! # Shared Types Crate
//!
//! Domain entities shared between the transaction pool and the chain-state
//! collaborators it consumes.
//!
//! - [`entities`]: hashes, output references, inputs, outputs, transactions.
//! - [`utxo`]: the unspent-output snapshot a chain-state provider returns.

pub mod entities;
pub mod utxo;

pub use entities::*;
pub use utxo::*;
