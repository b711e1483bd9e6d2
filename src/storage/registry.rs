use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::{Account, AccountId, OwnerId};

pub type AccountHandle = Arc<Mutex<Account>>;

/// Registry of live accounts.
///
/// Lock order: the registry lock is always taken before any account lock, and
/// several account locks are always taken in ascending `AccountId` order.
#[derive(Debug, Default)]
pub struct AccountRegistry {
    inner: RwLock<Accounts>,
}

/// Registry contents, reachable only through the registry lock.
#[derive(Debug, Default)]
pub struct Accounts {
    by_id: HashMap<AccountId, AccountHandle>,
    /// Creation order
    order: Vec<AccountId>,
    names: HashSet<(OwnerId, String)>,
}

impl Accounts {
    pub fn has_name(&self, owner_id: OwnerId, name: &str) -> bool {
        self.names.contains(&(owner_id, name.to_string()))
    }

    pub fn insert(&mut self, account: Account) -> AccountHandle {
        let id = account.id;
        self.names.insert((account.owner_id, account.name.clone()));
        let handle = Arc::new(Mutex::new(account));
        self.by_id.insert(id, Arc::clone(&handle));
        self.order.push(id);
        handle
    }

    pub fn creation_order(&self) -> &[AccountId] {
        &self.order
    }

    /// Every account handle sorted by id, the order in which they may be locked together.
    pub fn handles_in_lock_order(&self) -> Vec<AccountHandle> {
        let mut ids: Vec<AccountId> = self.order.clone();
        ids.sort();
        ids.iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect()
    }

    /// Undo an `insert` whose side effects could not be committed.
    pub fn remove(&mut self, id: AccountId) {
        if let Some(handle) = self.by_id.remove(&id) {
            let account = handle.lock();
            self.names.remove(&(account.owner_id, account.name.clone()));
        }
        self.order.retain(|existing| *existing != id);
    }
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared access that keeps the set of accounts fixed while held.
    pub fn read(&self) -> RwLockReadGuard<'_, Accounts> {
        self.inner.read()
    }

    /// Exclusive access for operations that must check and register atomically.
    pub fn write(&self) -> RwLockWriteGuard<'_, Accounts> {
        self.inner.write()
    }

    pub fn get(&self, id: AccountId) -> Option<AccountHandle> {
        self.inner.read().by_id.get(&id).cloned()
    }

    /// Consistent copy of one account.
    pub fn snapshot(&self, id: AccountId) -> Option<Account> {
        self.get(id).map(|handle| handle.lock().clone())
    }

    /// Copies of the accounts matching `filter`, in creation order.
    pub fn snapshots_where(&self, filter: impl Fn(&Account) -> bool) -> Vec<Account> {
        let accounts = self.inner.read();
        accounts
            .order
            .iter()
            .filter_map(|id| accounts.by_id.get(id))
            .filter_map(|handle| {
                let account = handle.lock();
                filter(&account).then(|| account.clone())
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::Money;

    fn account(owner: OwnerId, name: &str) -> Account {
        Account::new(Uuid::new_v4(), owner, name, Money::ZERO).unwrap()
    }

    #[test]
    fn test_insert_and_lookup() {
        let registry = AccountRegistry::new();
        let owner = Uuid::new_v4();
        let checking = account(owner, "Checking");
        let id = checking.id;

        registry.write().insert(checking);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot(id).map(|a| a.name), Some("Checking".to_string()));
        assert!(registry.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_names_are_tracked_per_owner() {
        let registry = AccountRegistry::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        registry.write().insert(account(alice, "Savings"));

        let accounts = registry.write();
        assert!(accounts.has_name(alice, "Savings"));
        assert!(!accounts.has_name(bob, "Savings"));
        assert!(!accounts.has_name(alice, "savings"));
    }

    #[test]
    fn test_remove_forgets_name() {
        let registry = AccountRegistry::new();
        let owner = Uuid::new_v4();
        let savings = account(owner, "Savings");
        let id = savings.id;

        let mut accounts = registry.write();
        accounts.insert(savings);
        accounts.remove(id);
        assert!(!accounts.has_name(owner, "Savings"));
        drop(accounts);

        assert!(registry.is_empty());
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn test_snapshots_keep_creation_order() {
        let registry = AccountRegistry::new();
        let owner = Uuid::new_v4();
        for name in ["A", "B", "C"] {
            registry.write().insert(account(owner, name));
        }
        registry.write().insert(account(Uuid::new_v4(), "D"));

        let names: Vec<String> = registry
            .snapshots_where(|a| a.owner_id == owner)
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_handles_sorted_by_id() {
        let registry = AccountRegistry::new();
        let owner = Uuid::new_v4();
        for name in ["A", "B", "C", "D"] {
            registry.write().insert(account(owner, name));
        }

        let ids: Vec<AccountId> = registry
            .read()
            .handles_in_lock_order()
            .iter()
            .map(|h| h.lock().id)
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
