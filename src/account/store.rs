use crate::account::Account;
use crate::error::{PhantomError, Result};
use log::{debug, error, info};
use std::sync::{Mutex, MutexGuard};

/// Default number of account slots
pub const DEFAULT_MAX_ACCOUNTS: usize = 1000;

struct Slots {
    entries: Vec<Option<Account>>,
    count: usize,
}

/// Fixed-capacity account table
///
/// Accounts live in numbered slots; `create` takes the lowest free slot and
/// `list` reports slots in index order. Every operation holds the single store
/// lock, so concurrent callers never see a half-written slot.
///
/// Lookups are a linear scan over all slots. That is fine for capacities in the
/// tens to low thousands and keeps `list` ordering tied to slot position.
pub struct AccountStore {
    inner: Mutex<Slots>,
    capacity: usize,
}

impl AccountStore {
    pub fn new(capacity: usize) -> AccountStore {
        AccountStore {
            inner: Mutex::new(Slots {
                entries: vec![None; capacity],
                count: 0,
            }),
            capacity,
        }
    }

    fn slots(&self) -> Result<MutexGuard<'_, Slots>> {
        self.inner
            .lock()
            .map_err(|e| PhantomError::Lock(format!("Failed to acquire account store lock: {e}")))
    }

    /// Generate a new account in the first free slot and return a copy of it.
    pub fn create(&self) -> Result<Account> {
        let mut slots = self.slots()?;
        if slots.count >= self.capacity {
            return Err(PhantomError::StoreFull {
                capacity: self.capacity,
            });
        }

        let index = slots
            .entries
            .iter()
            .position(Option::is_none)
            .ok_or(PhantomError::StoreFull {
                capacity: self.capacity,
            })?;

        let account = Account::generate()?;
        slots.entries[index] = Some(account.clone());
        slots.count += 1;

        debug!("Stored account {} in slot {index}", account.get_id());
        Ok(account)
    }

    /// Remove the first live account with this id. Returns whether one was found.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut slots = self.slots()?;
        let found = slots
            .entries
            .iter()
            .position(|entry| matches!(entry, Some(account) if account.get_id() == id));

        match found {
            Some(index) => {
                // Dropping the record zeroizes it.
                slots.entries[index] = None;
                slots.count -= 1;
                debug!("Released account slot {index}");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Snapshot of all live accounts in slot order.
    pub fn list(&self) -> Result<Vec<Account>> {
        let slots = self.slots()?;
        Ok(slots.entries.iter().flatten().cloned().collect())
    }

    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(slots) => slots.count,
            Err(_) => {
                error!("Failed to acquire account store lock");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every account. Used at teardown.
    pub fn clear(&self) {
        match self.inner.lock() {
            Ok(mut slots) => {
                let removed = slots.count;
                slots.entries.iter_mut().for_each(|entry| *entry = None);
                slots.count = 0;
                info!("Cleared {removed} accounts");
            }
            Err(_) => {
                error!("Failed to acquire account store lock");
            }
        }
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ACCOUNTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_create_until_full() {
        let store = AccountStore::new(3);
        for _ in 0..3 {
            store.create().unwrap();
        }
        assert_eq!(store.len(), 3);

        let err = store.create().unwrap_err();
        assert_eq!(err, PhantomError::StoreFull { capacity: 3 });
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_delete_twice() {
        let store = AccountStore::new(4);
        let account = store.create().unwrap();

        assert!(store.delete(account.get_id()).unwrap());
        assert!(!store.delete(account.get_id()).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_unknown_leaves_store_alone() {
        let store = AccountStore::new(4);
        store.create().unwrap();
        assert!(!store.delete("ghost-id").unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_list_count_tracks_creates_and_deletes() {
        let store = AccountStore::new(10);
        let created: Vec<Account> = (0..6).map(|_| store.create().unwrap()).collect();
        assert!(store.delete(created[1].get_id()).unwrap());
        assert!(store.delete(created[4].get_id()).unwrap());

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 4);
        assert_eq!(listed.len(), store.len());
    }

    #[test]
    fn test_list_is_slot_ordered() {
        let store = AccountStore::new(3);
        let a = store.create().unwrap();
        let b = store.create().unwrap();
        let c = store.create().unwrap();

        // Freeing slot 0 and creating again reuses it, so the newest account
        // is listed first.
        assert!(store.delete(a.get_id()).unwrap());
        let d = store.create().unwrap();

        let ids: Vec<String> = store
            .list()
            .unwrap()
            .iter()
            .map(|acc| acc.get_id().to_string())
            .collect();
        assert_eq!(ids, vec![d.get_id(), b.get_id(), c.get_id()]);
    }

    #[test]
    fn test_ids_are_unique() {
        let store = AccountStore::new(50);
        let ids: HashSet<String> = (0..50)
            .map(|_| store.create().unwrap().get_id().to_string())
            .collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_clear() {
        let store = AccountStore::new(5);
        store.create().unwrap();
        store.create().unwrap();
        store.clear();
        assert!(store.is_empty());
        assert!(store.list().unwrap().is_empty());
        // Slots are usable again after a clear.
        store.create().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_zero_capacity() {
        let store = AccountStore::new(0);
        assert!(matches!(
            store.create(),
            Err(PhantomError::StoreFull { capacity: 0 })
        ));
    }
}
