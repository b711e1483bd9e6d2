use thiserror::Error;

use crate::domain::{AccountError, AccountId, Money, OwnerId};
use crate::storage::StoreError;

use super::IdentityError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Money),

    #[error("Starting balance cannot be negative, got {0}")]
    NegativeStartingBalance(Money),

    #[error("Owner {owner_id} already has an account named {name:?}")]
    DuplicateAccountName { owner_id: OwnerId, name: String },

    #[error("Unknown owner: {0}")]
    UnknownOwner(OwnerId),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("User {requester} is not the owner of account {account_id}")]
    Unauthorized {
        account_id: AccountId,
        requester: OwnerId,
    },

    #[error("Insufficient funds in account {account_id}: balance {balance}, required {required}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Money,
        required: Money,
    },

    #[error("Cannot transfer from account {0} to itself")]
    SameAccountTransfer(AccountId),

    #[error("Balance of account {0} would exceed the representable range")]
    AmountOverflow(AccountId),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Machine-checkable error category, for adapters that map failures to
/// transport-specific codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAmount,
    NonPositiveAmount,
    NegativeStartingBalance,
    DuplicateAccountName,
    UnknownOwner,
    AccountNotFound,
    Unauthorized,
    InsufficientFunds,
    SameAccountTransfer,
    AmountOverflow,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidAmount => "INVALID_AMOUNT",
            ErrorKind::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            ErrorKind::NegativeStartingBalance => "NEGATIVE_STARTING_BALANCE",
            ErrorKind::DuplicateAccountName => "DUPLICATE_ACCOUNT_NAME",
            ErrorKind::UnknownOwner => "UNKNOWN_OWNER",
            ErrorKind::AccountNotFound => "ACCOUNT_NOT_FOUND",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ErrorKind::SameAccountTransfer => "SAME_ACCOUNT_TRANSFER",
            ErrorKind::AmountOverflow => "AMOUNT_OVERFLOW",
            ErrorKind::Storage => "STORAGE",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<IdentityError> for LedgerError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UnknownOwner(owner_id) => LedgerError::UnknownOwner(owner_id),
        }
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            LedgerError::NonPositiveAmount(_) => ErrorKind::NonPositiveAmount,
            LedgerError::NegativeStartingBalance(_) => ErrorKind::NegativeStartingBalance,
            LedgerError::DuplicateAccountName { .. } => ErrorKind::DuplicateAccountName,
            LedgerError::UnknownOwner(_) => ErrorKind::UnknownOwner,
            LedgerError::AccountNotFound(_) => ErrorKind::AccountNotFound,
            LedgerError::Unauthorized { .. } => ErrorKind::Unauthorized,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::SameAccountTransfer(_) => ErrorKind::SameAccountTransfer,
            LedgerError::AmountOverflow(_) => ErrorKind::AmountOverflow,
            LedgerError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Lift an error raised by `Account` itself into the service error space.
    pub(crate) fn from_account(account_id: AccountId, err: AccountError) -> Self {
        match err {
            AccountError::NonPositiveAmount(amount) => LedgerError::NonPositiveAmount(amount),
            AccountError::NegativeStartingBalance(amount) => {
                LedgerError::NegativeStartingBalance(amount)
            }
            AccountError::InsufficientFunds { balance, requested } => {
                LedgerError::InsufficientFunds {
                    account_id,
                    balance,
                    required: requested,
                }
            }
            AccountError::AmountOverflow => LedgerError::AmountOverflow(account_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_kind_codes() {
        let id = Uuid::new_v4();
        assert_eq!(
            LedgerError::AccountNotFound(id).kind().as_str(),
            "ACCOUNT_NOT_FOUND"
        );
        assert_eq!(
            LedgerError::InvalidAmount("abc".into()).kind(),
            ErrorKind::InvalidAmount
        );
        assert_eq!(
            LedgerError::from(StoreError::Unavailable("down".into())).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_from_account_keeps_context() {
        let id = Uuid::new_v4();
        let err = LedgerError::from_account(
            id,
            AccountError::InsufficientFunds {
                balance: Money::from_units(10),
                requested: Money::from_units(15),
            },
        );
        match err {
            LedgerError::InsufficientFunds {
                account_id,
                balance,
                required,
            } => {
                assert_eq!(account_id, id);
                assert_eq!(balance.to_string(), "10.00");
                assert_eq!(required.to_string(), "15.00");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
