//! Wallet store implementations.
//!
//! The in-memory store is always available. Persistent backends are behind the
//! `storage-rocksdb` and `storage-postgres` features.

pub mod in_memory;
pub mod locking;
#[cfg(feature = "storage-postgres")]
pub mod postgres;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod row_locks;
