use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Money};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Funds an account is opened with
    InitialDeposit,
    Deposit,
    Withdrawal,
    /// Credit leg of a transfer
    TransferIn,
    /// Debit leg of a transfer
    TransferOut,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::InitialDeposit => "INITIAL_DEPOSIT",
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::TransferIn => "TRANSFER_IN",
            TransactionType::TransferOut => "TRANSFER_OUT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INITIAL_DEPOSIT" => Some(TransactionType::InitialDeposit),
            "DEPOSIT" => Some(TransactionType::Deposit),
            "WITHDRAWAL" => Some(TransactionType::Withdrawal),
            "TRANSFER_IN" => Some(TransactionType::TransferIn),
            "TRANSFER_OUT" => Some(TransactionType::TransferOut),
            _ => None,
        }
    }

    /// Returns true if this entry increases the account balance
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            TransactionType::InitialDeposit | TransactionType::Deposit | TransactionType::TransferIn
        )
    }

    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            TransactionType::TransferIn | TransactionType::TransferOut
        )
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One balance change on one account. Records are immutable once appended to
/// the transaction log; corrections are made by recording new entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    /// Position in the log, assigned on append (starts at 1)
    pub sequence: u64,
    pub account_id: AccountId,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Always positive
    pub amount: Money,
    pub timestamp: DateTime<Utc>,
    /// Counterparty, only set on transfer legs
    pub related_account_id: Option<AccountId>,
}

impl TransactionRecord {
    /// Create a new record. The sequence number is assigned by the log.
    pub fn new(
        account_id: AccountId,
        transaction_type: TransactionType,
        amount: Money,
        timestamp: DateTime<Utc>,
    ) -> Self {
        debug_assert!(amount.is_positive(), "Transaction amount must be positive");
        Self {
            id: Uuid::new_v4(),
            sequence: 0,
            account_id,
            transaction_type,
            amount,
            timestamp,
            related_account_id: None,
        }
    }

    pub fn with_related_account(mut self, related: AccountId) -> Self {
        self.related_account_id = Some(related);
        self
    }

    /// Build the debit and credit legs of a transfer, in that order.
    pub fn transfer_pair(
        from: AccountId,
        to: AccountId,
        amount: Money,
        timestamp: DateTime<Utc>,
    ) -> (Self, Self) {
        let debit = Self::new(from, TransactionType::TransferOut, amount, timestamp)
            .with_related_account(to);
        let credit = Self::new(to, TransactionType::TransferIn, amount, timestamp)
            .with_related_account(from);
        (debit, credit)
    }

    /// Effect of this record on its account balance
    pub fn signed_amount(&self) -> Money {
        if self.transaction_type.is_credit() {
            self.amount
        } else {
            Money::from_decimal(-self.amount.as_decimal())
        }
    }
}
