use std::collections::HashSet;

use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::OwnerId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("owner {0} does not exist")]
    UnknownOwner(OwnerId),
}

/// Resolves the principals that may own accounts.
pub trait IdentityProvider: Send + Sync {
    fn resolve_owner(&self, owner_id: OwnerId) -> Result<(), IdentityError>;
}

/// In-memory set of known owners.
#[derive(Debug, Default)]
pub struct OwnerDirectory {
    owners: RwLock<HashSet<OwnerId>>,
}

impl OwnerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owners(owners: impl IntoIterator<Item = OwnerId>) -> Self {
        Self {
            owners: RwLock::new(owners.into_iter().collect()),
        }
    }

    /// Register a fresh owner and return its id.
    pub fn register(&self) -> OwnerId {
        let owner_id = Uuid::new_v4();
        self.owners.write().insert(owner_id);
        owner_id
    }

    pub fn insert(&self, owner_id: OwnerId) -> bool {
        self.owners.write().insert(owner_id)
    }

    pub fn contains(&self, owner_id: OwnerId) -> bool {
        self.owners.read().contains(&owner_id)
    }
}

impl IdentityProvider for OwnerDirectory {
    fn resolve_owner(&self, owner_id: OwnerId) -> Result<(), IdentityError> {
        if self.contains(owner_id) {
            Ok(())
        } else {
            Err(IdentityError::UnknownOwner(owner_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_owner_resolves() {
        let directory = OwnerDirectory::new();
        let owner = directory.register();
        assert_eq!(directory.resolve_owner(owner), Ok(()));
    }

    #[test]
    fn test_unknown_owner() {
        let directory = OwnerDirectory::with_owners([Uuid::new_v4()]);
        let stranger = Uuid::new_v4();
        assert_eq!(
            directory.resolve_owner(stranger),
            Err(IdentityError::UnknownOwner(stranger))
        );
    }

    #[test]
    fn test_insert_is_idempotent() {
        let directory = OwnerDirectory::new();
        let owner = Uuid::new_v4();
        assert!(directory.insert(owner));
        assert!(!directory.insert(owner));
        assert!(directory.contains(owner));
    }
}
