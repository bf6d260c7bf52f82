//! Domain layer: wallet value objects and the store ports the engine consumes.

pub mod ports;
pub mod transfer;
pub mod wallet;
