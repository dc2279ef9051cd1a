//! Transaction pool error types.
//!
//! Layered to match the admission pipeline: structural defects
//! ([`SanityError`]), value and availability problems ([`InputError`]),
//! authorization failures ([`ScriptError`]) and pool/chain-state
//! rejections carried by [`TxPoolError`].

use super::entities::{Hash, OutPoint};
use thiserror::Error;

/// Context-free structural defects. Never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SanityError {
    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("transaction output {index} has negative value {value}")]
    NegativeOutputValue { index: usize, value: i64 },

    #[error("total value of all transaction outputs overflows")]
    AmountOverflow,

    #[error("total value of all transaction outputs is {total}, higher than max allowed value of {max}")]
    AmountExceedsMax { total: i64, max: i64 },

    #[error("transaction contains duplicate input {0}")]
    DuplicateInput(OutPoint),

    #[error("transaction input {index} refers to previous output that is null")]
    NullInputReference { index: usize },
}

/// Missing inputs or value/fee inconsistencies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("output {outpoint} referenced from input {index} either does not exist or has already been spent")]
    MissingOrSpentInput { index: usize, outpoint: OutPoint },

    #[error("transaction output {outpoint} has negative value {value}")]
    NegativeSourceValue { outpoint: OutPoint, value: i64 },

    #[error("transaction output {outpoint} has value {value}, higher than max allowed value of {max}")]
    SourceExceedsMax { outpoint: OutPoint, value: i64, max: i64 },

    #[error("total value of all transaction inputs overflows")]
    AmountOverflow,

    #[error("total value of all transaction inputs is {total}, higher than max allowed value of {max}")]
    AmountExceedsMax { total: i64, max: i64 },

    #[error("total value of all transaction inputs ({input}) is less than the amount spent ({output})")]
    InsufficientInput { input: i64, output: i64 },
}

/// Authorization failure reported by the script validator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script verification failed for input {index}: {reason}")]
    VerificationFailed { index: usize, reason: String },
}

/// Chain-state provider failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainStateError {
    #[error("chain state unavailable: {0}")]
    Unavailable(String),
}

/// Transaction pool error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TxPoolError {
    #[error("already have transaction {}", hex::encode(.0))]
    AlreadyInPool(Hash),

    #[error(transparent)]
    Sanity(#[from] SanityError),

    #[error("output {outpoint} already spent by transaction {} in the memory pool", hex::encode(.spent_by))]
    PoolDoubleSpend { outpoint: OutPoint, spent_by: Hash },

    #[error(transparent)]
    ChainState(#[from] ChainStateError),

    #[error("transaction {} already exists", hex::encode(.0))]
    AlreadyConfirmed(Hash),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("orphan transaction {} references outputs of unknown or fully-spent transaction {}", hex::encode(.tx), hex::encode(.missing_parent))]
    OrphanRejected { tx: Hash, missing_parent: Hash },
}

impl TxPoolError {
    /// Stable label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::AlreadyInPool(_) => "already_in_pool",
            Self::Sanity(_) => "sanity",
            Self::PoolDoubleSpend { .. } => "pool_double_spend",
            Self::ChainState(_) => "chain_state",
            Self::AlreadyConfirmed(_) => "already_confirmed",
            Self::Input(_) => "input",
            Self::Script(_) => "script",
            Self::OrphanRejected { .. } => "orphan_rejected",
        }
    }
}
