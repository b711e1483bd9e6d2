use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::MutexGuard;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    Account, AccountError, AccountId, IntegrityReport, Money, OwnerId, TransactionRecord,
    TransactionType, build_integrity_report,
};
use crate::storage::{AccountHandle, AccountRegistry, StoreError, TransactionLog, TransactionStore};

use super::validation::{parse_positive_amount, parse_starting_balance};
use super::{IdentityProvider, LedgerConfig, LedgerError};

/// Application service providing every money-moving operation.
/// This is the primary interface for any client (CLI, API, RPC, etc.).
pub struct LedgerService {
    accounts: AccountRegistry,
    log: Arc<dyn TransactionStore>,
    identity: Arc<dyn IdentityProvider>,
    config: LedgerConfig,
}

/// Result of a transfer: both accounts after the move and the two log entries.
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub from_account: Account,
    pub to_account: Account,
    pub debit: TransactionRecord,
    pub credit: TransactionRecord,
}

/// Accounts (in creation order) and log records taken from the same instant.
#[derive(Debug, Clone)]
pub struct LedgerView {
    pub accounts: Vec<Account>,
    pub records: Vec<TransactionRecord>,
}

impl LedgerView {
    pub fn integrity(&self) -> IntegrityReport {
        build_integrity_report(&self.accounts, &self.records)
    }
}

impl LedgerService {
    /// Create a service backed by an in-memory transaction log.
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            accounts: AccountRegistry::new(),
            log: Arc::new(TransactionLog::new()),
            identity,
            config: LedgerConfig::default(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn TransactionStore>) -> Self {
        self.log = store;
        self
    }

    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ========================
    // Account operations
    // ========================

    /// Open a new account. A positive starting balance is recorded as an
    /// INITIAL_DEPOSIT; a zero balance records nothing.
    pub fn create_account(
        &self,
        owner_id: OwnerId,
        name: impl Into<String>,
        starting_balance: &str,
    ) -> Result<Account, LedgerError> {
        let starting_balance = parse_starting_balance(starting_balance, &self.config)?;
        let name = name.into();

        self.identity.resolve_owner(owner_id)?;

        // Hold the registry for the duplicate check, registration and initial record
        let mut accounts = self.accounts.write();
        if accounts.has_name(owner_id, &name) {
            return Err(LedgerError::DuplicateAccountName { owner_id, name });
        }

        let account_id = Uuid::new_v4();
        let account = Account::new(account_id, owner_id, name, starting_balance)
            .map_err(|err| LedgerError::from_account(account_id, err))?;
        accounts.insert(account.clone());

        if starting_balance.is_positive() {
            let record = TransactionRecord::new(
                account_id,
                TransactionType::InitialDeposit,
                starting_balance,
                account.created_at,
            );
            if let Err(err) = self.log.append(record) {
                accounts.remove(account_id);
                return Err(err.into());
            }
        }
        drop(accounts);

        info!(
            %account_id,
            %owner_id,
            balance = %starting_balance,
            "account created"
        );
        Ok(account)
    }

    /// Get a consistent copy of an account.
    pub fn get_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.accounts
            .snapshot(account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// All accounts belonging to `owner_id`, in creation order.
    pub fn list_accounts_by_owner(&self, owner_id: OwnerId) -> Vec<Account> {
        self.accounts
            .snapshots_where(|account| account.is_owned_by(owner_id))
    }

    /// Every account, in creation order.
    pub fn list_accounts(&self) -> Vec<Account> {
        self.accounts.snapshots_where(|_| true)
    }

    // ========================
    // Money movements
    // ========================

    pub fn deposit(
        &self,
        account_id: AccountId,
        requesting_user_id: OwnerId,
        amount: &str,
    ) -> Result<Account, LedgerError> {
        let amount = parse_positive_amount(amount, &self.config)?;
        self.apply_to_account(
            account_id,
            requesting_user_id,
            amount,
            TransactionType::Deposit,
            Account::deposit,
        )
    }

    pub fn withdraw(
        &self,
        account_id: AccountId,
        requesting_user_id: OwnerId,
        amount: &str,
    ) -> Result<Account, LedgerError> {
        let amount = parse_positive_amount(amount, &self.config)?;
        self.apply_to_account(
            account_id,
            requesting_user_id,
            amount,
            TransactionType::Withdrawal,
            Account::withdraw,
        )
    }

    /// Move money between two accounts. Only the source owner may initiate a
    /// transfer; the destination may belong to anyone.
    ///
    /// Both accounts stay locked from the debit until both log entries are
    /// appended, so no reader ever sees one side of the move without the other.
    pub fn transfer(
        &self,
        requesting_user_id: OwnerId,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: &str,
    ) -> Result<TransferResult, LedgerError> {
        if from_account_id == to_account_id {
            return Err(LedgerError::SameAccountTransfer(from_account_id));
        }
        let amount = parse_positive_amount(amount, &self.config)?;

        let from_handle = self.handle(from_account_id)?;
        let to_handle = self.handle(to_account_id)?;

        let (mut source, mut destination) =
            lock_pair(from_account_id, &from_handle, to_account_id, &to_handle);

        authorize(&source, requesting_user_id)?;

        let source_before = source.balance();
        let destination_before = destination.balance();

        if let Err(err) = source.withdraw(amount) {
            return Err(rejected(from_account_id, err));
        }
        if let Err(err) = destination.deposit(amount) {
            source.restore_balance(source_before);
            return Err(rejected(to_account_id, err));
        }

        let (debit, credit) =
            TransactionRecord::transfer_pair(from_account_id, to_account_id, amount, Utc::now());
        let committed = self
            .log
            .append_batch(vec![debit, credit])
            .and_then(|records| {
                <[TransactionRecord; 2]>::try_from(records).map_err(|_| {
                    StoreError::Unavailable("transfer pair was not committed whole".to_string())
                })
            });
        let [debit, credit] = match committed {
            Ok(pair) => pair,
            Err(err) => {
                source.restore_balance(source_before);
                destination.restore_balance(destination_before);
                return Err(err.into());
            }
        };

        info!(
            from = %from_account_id,
            to = %to_account_id,
            %amount,
            "transfer committed"
        );

        Ok(TransferResult {
            from_account: Account::clone(&source),
            to_account: Account::clone(&destination),
            debit,
            credit,
        })
    }

    // ========================
    // Queries
    // ========================

    /// Ledger entries for one account in the order they were recorded.
    /// Authorization is the caller's concern.
    pub fn transaction_history(&self, account_id: AccountId) -> Vec<TransactionRecord> {
        self.log.records_for_account(account_id)
    }

    pub fn all_transactions(&self) -> Vec<TransactionRecord> {
        self.log.all_records()
    }

    /// Every account and the whole log, captured at one instant.
    ///
    /// The registry and every account stay locked (ascending id order) while
    /// the log is read, so no transfer is ever half visible.
    pub fn ledger_view(&self) -> LedgerView {
        let registry = self.accounts.read();
        let handles = registry.handles_in_lock_order();
        let guards: Vec<MutexGuard<'_, Account>> = handles.iter().map(|h| h.lock()).collect();

        let mut by_id: HashMap<AccountId, Account> = guards
            .iter()
            .map(|guard| (guard.id, Account::clone(guard)))
            .collect();
        let records = self.log.all_records();
        drop(guards);

        let accounts = registry
            .creation_order()
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();
        drop(registry);

        LedgerView { accounts, records }
    }

    /// Replay the log against a frozen view of every account.
    pub fn check_integrity(&self) -> IntegrityReport {
        self.ledger_view().integrity()
    }

    // ========================
    // Internals
    // ========================

    fn handle(&self, account_id: AccountId) -> Result<AccountHandle, LedgerError> {
        self.accounts
            .get(account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Apply a single-account mutation and record it, as one critical section.
    fn apply_to_account(
        &self,
        account_id: AccountId,
        requesting_user_id: OwnerId,
        amount: Money,
        transaction_type: TransactionType,
        mutate: fn(&mut Account, Money) -> Result<(), AccountError>,
    ) -> Result<Account, LedgerError> {
        let handle = self.handle(account_id)?;
        let mut account = handle.lock();
        authorize(&account, requesting_user_id)?;

        let before = account.balance();
        if let Err(err) = mutate(&mut *account, amount) {
            return Err(rejected(account_id, err));
        }

        let record = TransactionRecord::new(account_id, transaction_type, amount, Utc::now());
        if let Err(err) = self.log.append(record) {
            account.restore_balance(before);
            return Err(err.into());
        }

        info!(
            %account_id,
            kind = transaction_type.as_str(),
            %amount,
            balance = %account.balance(),
            "transaction committed"
        );
        Ok(Account::clone(&account))
    }
}

fn authorize(account: &Account, requesting_user_id: OwnerId) -> Result<(), LedgerError> {
    if account.is_owned_by(requesting_user_id) {
        return Ok(());
    }
    warn!(
        account_id = %account.id,
        requester = %requesting_user_id,
        "rejected operation by non-owner"
    );
    Err(LedgerError::Unauthorized {
        account_id: account.id,
        requester: requesting_user_id,
    })
}

fn rejected(account_id: AccountId, err: AccountError) -> LedgerError {
    let err = LedgerError::from_account(account_id, err);
    warn!(%account_id, error = %err, "operation rejected");
    err
}

/// Lock two distinct accounts in ascending id order, returning the guards as
/// (from, to).
fn lock_pair<'a>(
    from_id: AccountId,
    from: &'a AccountHandle,
    to_id: AccountId,
    to: &'a AccountHandle,
) -> (MutexGuard<'a, Account>, MutexGuard<'a, Account>) {
    if from_id < to_id {
        let from_guard = from.lock();
        let to_guard = to.lock();
        (from_guard, to_guard)
    } else {
        let to_guard = to.lock();
        let from_guard = from.lock();
        (from_guard, to_guard)
    }
}
