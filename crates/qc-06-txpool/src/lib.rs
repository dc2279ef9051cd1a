//! # Transaction Pool Subsystem
//!
//! **Subsystem ID:** 6
//!
//! ## Purpose
//!
//! Admits free-standing UTXO transactions before they are mined, validates
//! them against chain state plus other pending transactions, and holds
//! transactions with unknown parents ("orphans") until the parents arrive or
//! the orphans expire.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | At most one pool transaction claims any output | `domain/pool.rs` - `check_double_spend()` |
//! | A hash lives in at most one of {main pool, orphan pool} | `service.rs` - duplicate check, promotion |
//! | Waiting index only references stored orphans | `domain/orphans.rs` - `unregister()` |
//! | Cascading removal never recurses | `domain/pool.rs`, `domain/orphans.rs` - explicit work lists |
//!
//! ## Admission
//!
//! ```text
//! process_transaction(tx)
//!   ├─ accepted ──→ main pool ──→ promote waiting orphans (BFS) ──→ purge orphan double-spends
//!   ├─ missing parents + allow_orphan ──→ orphan pool (TTL 15 min)
//!   └─ missing parents, no orphans ──→ OrphanRejected
//! ```
//!
//! | Stage | Failure |
//! |-------|---------|
//! | Duplicate | `AlreadyInPool` |
//! | Sanity | `Sanity(..)` |
//! | Pool double-spend | `PoolDoubleSpend` |
//! | Chain view | `ChainState(..)`, `AlreadyConfirmed` |
//! | Inputs / fee | `Input(..)` |
//! | Scripts | `Script(..)` |
//!
//! ## Orphan Eviction
//!
//! Expiry is cooperative: it runs only when an orphan is added, at most once
//! per scan interval (5 min). Expired orphans are removed with their
//! redeemers. When the pool is full one random orphan is dropped, without
//! its redeemers.
//!
//! ## Outbound Dependencies
//!
//! | Collaborator | Trait | Purpose |
//! |--------------|-------|---------|
//! | Chain state | `UtxoViewProvider` | Snapshot of referenced outputs |
//! | Crypto | `ScriptValidator` | Authorization checks |
//! | Clock | `TimeSource` | TTLs, scan gate, freshness |
//!
//! ## Example
//!
//! ```rust,ignore
//! use qc_06_txpool::{TxPoolApi, TxPoolConfig, TxPoolService};
//! use qc_06_txpool::adapters::{AcceptAllScripts, InMemoryChainState};
//! use std::sync::Arc;
//!
//! let pool = TxPoolService::new(
//!     TxPoolConfig::from_env(),
//!     Arc::new(InMemoryChainState::new()),
//!     Arc::new(AcceptAllScripts),
//! );
//! let accepted = pool.process_transaction(tx, true)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ports::*;
pub use service::TxPoolService;
