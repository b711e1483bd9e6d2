use std::collections::HashMap;

use serde::Serialize;

use super::{Account, AccountId, Money, TransactionRecord, TransactionType};

/// Replay the balance of a single account from the transaction log.
/// Balance = sum of credits - sum of debits
///
/// Returns `None` if the running total leaves the decimal range.
pub fn compute_balance(account_id: AccountId, records: &[TransactionRecord]) -> Option<Money> {
    records
        .iter()
        .filter(|record| record.account_id == account_id)
        .try_fold(Money::ZERO, |balance, record| {
            balance.checked_add(record.signed_amount())
        })
}

/// Count transfer legs that have no matching counterpart leg.
///
/// A TRANSFER_OUT on A referencing B pairs with a TRANSFER_IN on B referencing
/// A for the same amount.
pub fn count_unpaired_transfers(records: &[TransactionRecord]) -> usize {
    let mut open: HashMap<(AccountId, AccountId, Money), i64> = HashMap::new();

    for record in records.iter().filter(|r| r.transaction_type.is_transfer()) {
        let Some(related) = record.related_account_id else {
            // a transfer leg without a counterparty can never be paired
            *open.entry((record.account_id, record.account_id, record.amount)).or_insert(0) += 1;
            continue;
        };
        let key = match record.transaction_type {
            TransactionType::TransferOut => (record.account_id, related, record.amount),
            _ => (related, record.account_id, record.amount),
        };
        let delta = if record.transaction_type == TransactionType::TransferOut {
            1
        } else {
            -1
        };
        *open.entry(key).or_insert(0) += delta;
    }

    open.values().map(|n| n.unsigned_abs() as usize).sum()
}

/// Returns true if log sequence numbers run 1, 2, 3, ... without gaps.
pub fn has_sequence_gaps(records: &[TransactionRecord]) -> bool {
    records
        .iter()
        .enumerate()
        .any(|(idx, record)| record.sequence != idx as u64 + 1)
}

/// An account whose stored balance disagrees with the balance replayed from
/// the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceMismatch {
    pub account_id: AccountId,
    pub account_name: String,
    pub stored: Money,
    pub replayed: Option<Money>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub account_count: usize,
    pub record_count: usize,
    pub mismatches: Vec<BalanceMismatch>,
    pub unpaired_transfers: usize,
    pub has_sequence_gaps: bool,
    pub orphan_records: usize,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.mismatches.is_empty()
            && self.unpaired_transfers == 0
            && !self.has_sequence_gaps
            && self.orphan_records == 0
    }
}

/// Cross-check account balances against the transaction log.
pub fn build_integrity_report(
    accounts: &[Account],
    records: &[TransactionRecord],
) -> IntegrityReport {
    let mismatches = accounts
        .iter()
        .filter_map(|account| {
            let replayed = compute_balance(account.id, records);
            if replayed == Some(account.balance()) {
                None
            } else {
                Some(BalanceMismatch {
                    account_id: account.id,
                    account_name: account.name.clone(),
                    stored: account.balance(),
                    replayed,
                })
            }
        })
        .collect();

    let orphan_records = records
        .iter()
        .filter(|record| !accounts.iter().any(|a| a.id == record.account_id))
        .count();

    IntegrityReport {
        account_count: accounts.len(),
        record_count: records.len(),
        mismatches,
        unpaired_transfers: count_unpaired_transfers(records),
        has_sequence_gaps: has_sequence_gaps(records),
        orphan_records,
    }
}
