// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use coffer::application::{ErrorKind, LedgerError, LedgerService, OwnerDirectory};
use coffer::domain::{Account, OwnerId};

/// Helper to create a service with an empty owner directory
pub fn test_service() -> (LedgerService, Arc<OwnerDirectory>) {
    let directory = Arc::new(OwnerDirectory::new());
    let service = LedgerService::new(directory.clone());
    (service, directory)
}

/// Extract the error kind from a failed operation
pub fn kind_of<T: std::fmt::Debug>(result: Result<T, LedgerError>) -> ErrorKind {
    result.expect_err("operation should have failed").kind()
}

/// Test fixture: two owners, each with one funded account
pub struct TwoOwners {
    pub service: LedgerService,
    pub directory: Arc<OwnerDirectory>,
    pub alice: OwnerId,
    pub bob: OwnerId,
    pub alice_checking: Account,
    pub bob_savings: Account,
}

impl TwoOwners {
    /// Alice's Checking starts at 1000.00, Bob's Savings at 500.00
    pub fn create() -> Result<Self> {
        let (service, directory) = test_service();
        let alice = directory.register();
        let bob = directory.register();
        let alice_checking = service.create_account(alice, "Checking", "1000.00")?;
        let bob_savings = service.create_account(bob, "Savings", "500.00")?;
        Ok(Self {
            service,
            directory,
            alice,
            bob,
            alice_checking,
            bob_savings,
        })
    }

    pub fn balance_of(&self, account: &Account) -> Result<String> {
        Ok(self.service.get_account(account.id)?.balance().to_string())
    }
}
