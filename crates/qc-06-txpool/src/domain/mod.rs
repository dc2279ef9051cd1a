//! # Domain Layer - Transaction Pool
//!
//! Pure business logic with no locking and no I/O.
//!
//! ## Components
//!
//! - `entities`: TxEntry, OrphanEntry, AdmissionOutcome, TxPoolConfig
//! - `validation`: sanity and input/fee checks
//! - `pool`: MainPool with its spend index
//! - `orphans`: OrphanPool with its waiting index and eviction policy
//! - `errors`: layered error enumerations

pub mod entities;
pub mod errors;
pub mod orphans;
pub mod pool;
pub mod validation;

pub use entities::*;
pub use errors::*;
pub use orphans::*;
pub use pool::*;
pub use validation::*;
