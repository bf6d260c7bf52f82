use crate::domain::wallet::Address;
use crate::error::StoreError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as SlotMapMutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

type SlotMap = HashMap<Address, Arc<Mutex<()>>>;

/// Exclusive lock held on one wallet row for the lifetime of a transaction.
///
/// Dropping the guard releases the row, and removes its slot from the table
/// once nobody else holds or waits on it.
pub struct RowGuard {
    _lock: OwnedMutexGuard<()>,
    _slot: SlotRef,
}

/// One counted reference to a slot in the table. Every holder and waiter owns one.
struct SlotRef {
    address: Address,
    slot: Arc<Mutex<()>>,
    slots: Arc<SlotMapMutex<SlotMap>>,
}

impl SlotRef {
    fn checkout(slots: &Arc<SlotMapMutex<SlotMap>>, address: &Address) -> Self {
        let slot = {
            let mut map = slots.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(address.clone()).or_default().clone()
        };
        Self {
            address: address.clone(),
            slot,
            slots: slots.clone(),
        }
    }
}

impl Drop for SlotRef {
    fn drop(&mut self) {
        // New slot references are only handed out under the map lock, so a
        // count of 2 (the map's and ours) cannot grow while we hold it.
        let mut map = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&self.slot) == 2 {
            map.remove(&self.address);
        }
    }
}

/// Per-address exclusive lock table for the embedded stores.
///
/// Keys are locked whether or not a row exists for them yet, so two
/// transactions creating the same wallet are serialized on the key. Only
/// addresses currently held or awaited occupy the table.
#[derive(Default, Clone)]
pub struct RowLocks {
    slots: Arc<SlotMapMutex<SlotMap>>,
    timeout: Option<Duration>,
}

impl RowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds every lock wait; `None` waits indefinitely.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            slots: Arc::default(),
            timeout,
        }
    }

    /// Blocks until the lock on `address` is free, then takes it.
    pub async fn acquire(&self, address: &Address) -> Result<RowGuard, StoreError> {
        let slot = SlotRef::checkout(&self.slots, address);
        let wait = slot.slot.clone().lock_owned();

        let lock = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, wait).await.map_err(|_| {
                StoreError::LockTimeout {
                    address: address.clone(),
                }
            })?,
            None => wait.await,
        };

        Ok(RowGuard {
            _lock: lock,
            _slot: slot,
        })
    }

    /// Number of addresses currently held or awaited.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(value: &str) -> Address {
        Address::parse(value).unwrap()
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_until_released() {
        let locks = RowLocks::with_timeout(Some(Duration::from_millis(50)));
        let guard = locks.acquire(&addr("A")).await.unwrap();

        let blocked = locks.acquire(&addr("A")).await;
        assert!(matches!(blocked, Err(StoreError::LockTimeout { .. })));

        drop(guard);
        assert!(locks.acquire(&addr("A")).await.is_ok());
    }

    #[tokio::test]
    async fn test_distinct_addresses_do_not_contend() {
        let locks = RowLocks::with_timeout(Some(Duration::from_millis(50)));
        let _a = locks.acquire(&addr("A")).await.unwrap();
        assert!(locks.acquire(&addr("B")).await.is_ok());
    }

    #[tokio::test]
    async fn test_waiter_proceeds_after_release() {
        let locks = RowLocks::new();
        let guard = locks.acquire(&addr("A")).await.unwrap();

        let contender = locks.clone();
        let handle = tokio::spawn(async move { contender.acquire(&addr("A")).await.is_ok() });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        drop(guard);
        assert!(handle.await.unwrap());
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_released_slots_are_evicted() {
        let locks = RowLocks::new();
        for i in 0..10_000 {
            let guard = locks.acquire(&addr(&format!("W{i}"))).await.unwrap();
            assert_eq!(locks.len(), 1);
            drop(guard);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_slot_survives_while_awaited() {
        let locks = RowLocks::new();
        let guard = locks.acquire(&addr("A")).await.unwrap();

        let contender = locks.clone();
        let handle = tokio::spawn(async move {
            let _second = contender.acquire(&addr("A")).await.unwrap();
            contender.len()
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        assert_eq!(locks.len(), 1);
        assert_eq!(handle.await.unwrap(), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_timed_out_waiter_leaves_no_slot() {
        let locks = RowLocks::with_timeout(Some(Duration::from_millis(20)));
        let guard = locks.acquire(&addr("A")).await.unwrap();

        assert!(locks.acquire(&addr("A")).await.is_err());
        assert_eq!(locks.len(), 1);

        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_no_slot() {
        let locks = RowLocks::new();
        let guard = locks.acquire(&addr("A")).await.unwrap();

        let contender = locks.clone();
        let handle = tokio::spawn(async move { contender.acquire(&addr("A")).await.is_ok() });
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.abort();
        assert!(handle.await.is_err());

        drop(guard);
        assert!(locks.is_empty());
    }
}
