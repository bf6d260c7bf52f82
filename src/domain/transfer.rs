use super::wallet::Address;
use serde::Deserialize;

/// A single requested movement of value, as read from a batch input.
///
/// `amount` is kept as raw signed input so that non-positive values reach the
/// engine and are rejected there like any other caller input.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct TransferRequest {
    pub from: Address,
    pub to: Address,
    pub amount: i64,
}
