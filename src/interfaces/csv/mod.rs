//! CSV adapters: transfer requests in, wallet balances out.

pub mod transfer_reader;
pub mod wallet_writer;
