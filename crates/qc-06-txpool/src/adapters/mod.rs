//! # Adapters
//!
//! Concrete implementations of the outbound ports.
//!
//! - `InMemoryChainState`: confirmed UTXO set held in memory
//! - `AcceptAllScripts`: pass-through script validator

pub mod memory_chain;
pub mod scripts;

pub use memory_chain::InMemoryChainState;
pub use scripts::AcceptAllScripts;
