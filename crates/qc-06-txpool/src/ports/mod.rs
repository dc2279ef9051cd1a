//! Ports layer for the transaction pool.
//!
//! Defines the hexagonal architecture port traits:
//! - Inbound (Driving) ports: API exposed to node components
//! - Outbound (Driven) ports: chain state, script verification, time

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
