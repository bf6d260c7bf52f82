use crate::error::TransferError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique, immutable wallet identifier.
///
/// The derived ordering (lexicographic over the underlying string) is the
/// canonical order in which a transfer locks its two wallets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(value: impl Into<String>) -> Result<Self, TransferError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TransferError::InvalidAddress(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = TransferError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Units of value held by a wallet. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(pub u64);

impl Balance {
    pub const ZERO: Self = Self(0);

    pub fn new(units: u64) -> Self {
        Self(units)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn checked_add(self, amount: Amount) -> Option<Self> {
        self.0.checked_add(amount.value()).map(Self)
    }

    pub fn checked_sub(self, amount: Amount) -> Option<Self> {
        self.0.checked_sub(amount.value()).map(Self)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A strictly positive quantity moved by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(u64);

impl Amount {
    /// Validates raw caller input. Zero and negative values are rejected.
    pub fn new(amount: i64) -> Result<Self, TransferError> {
        match u64::try_from(amount) {
            Ok(units) if units > 0 => Ok(Self(units)),
            _ => Err(TransferError::InvalidAmount { amount }),
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = TransferError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A persistent balance record keyed by address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: Address,
    pub balance: Balance,
}

impl Wallet {
    /// A freshly materialized wallet with a zero balance.
    pub fn new(address: Address) -> Self {
        Self::with_balance(address, Balance::ZERO)
    }

    pub fn with_balance(address: Address, balance: Balance) -> Self {
        Self { address, balance }
    }

    /// Removes `amount` from the balance, leaving it untouched on failure.
    pub fn withdraw(&mut self, amount: Amount) -> Result<(), TransferError> {
        match self.balance.checked_sub(amount) {
            Some(balance) => {
                self.balance = balance;
                Ok(())
            }
            None => Err(TransferError::InsufficientBalance {
                address: self.address.clone(),
                required: amount.value(),
                available: self.balance.value(),
            }),
        }
    }

    pub fn deposit(&mut self, amount: Amount) -> Result<(), TransferError> {
        match self.balance.checked_add(amount) {
            Some(balance) => {
                self.balance = balance;
                Ok(())
            }
            None => Err(TransferError::BalanceOverflow {
                address: self.address.clone(),
            }),
        }
    }

    pub fn can_cover(&self, amount: Amount) -> bool {
        self.balance.value() >= amount.value()
    }
}
