use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::Money;

pub type AccountId = Uuid;
pub type OwnerId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Money),

    #[error("starting balance cannot be negative, got {0}")]
    NegativeStartingBalance(Money),

    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Money, requested: Money },

    #[error("balance would exceed the representable range")]
    AmountOverflow,
}

/// A balance holder owned by a single principal.
///
/// The balance can only change through [`Account::deposit`] and
/// [`Account::withdraw`], and is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub owner_id: OwnerId,
    pub name: String,
    balance: Money,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        id: AccountId,
        owner_id: OwnerId,
        name: impl Into<String>,
        starting_balance: Money,
    ) -> Result<Self, AccountError> {
        if starting_balance.is_negative() {
            return Err(AccountError::NegativeStartingBalance(starting_balance));
        }
        Ok(Self {
            id,
            owner_id,
            name: name.into(),
            balance: starting_balance,
            created_at: Utc::now(),
        })
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn is_owned_by(&self, owner_id: OwnerId) -> bool {
        self.owner_id == owner_id
    }

    pub fn deposit(&mut self, amount: Money) -> Result<(), AccountError> {
        if !amount.is_positive() {
            return Err(AccountError::NonPositiveAmount(amount));
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(AccountError::AmountOverflow)?;
        Ok(())
    }

    pub fn withdraw(&mut self, amount: Money) -> Result<(), AccountError> {
        if !amount.is_positive() {
            return Err(AccountError::NonPositiveAmount(amount));
        }
        if amount > self.balance {
            return Err(AccountError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(AccountError::AmountOverflow)?;
        Ok(())
    }

    /// Put back a balance captured before a mutation whose audit entry could
    /// not be recorded.
    pub(crate) fn restore_balance(&mut self, balance: Money) {
        debug_assert!(!balance.is_negative());
        self.balance = balance;
    }
}
