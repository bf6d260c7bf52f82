//! Application layer containing the transfer orchestration.
//!
//! This module defines the `TransferEngine`, which moves value between two
//! wallets inside one store transaction, plus the bootstrap and batch helpers
//! built on top of it.

pub mod batch;
pub mod bootstrap;
pub mod engine;
