use parking_lot::RwLock;
use thiserror::Error;

use crate::domain::{AccountId, TransactionRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transaction store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only storage for transaction records.
///
/// Implementations must append a batch all-or-nothing: either every record in
/// the batch becomes visible to readers or none does.
pub trait TransactionStore: Send + Sync {
    /// Append records in order, assigning sequence numbers.
    /// Returns the records as committed.
    fn append_batch(
        &self,
        records: Vec<TransactionRecord>,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Snapshot of every record in insertion order.
    fn all_records(&self) -> Vec<TransactionRecord>;

    /// Records for one account, in insertion order.
    fn records_for_account(&self, account_id: AccountId) -> Vec<TransactionRecord>;

    fn len(&self) -> usize;

    fn append(&self, record: TransactionRecord) -> Result<TransactionRecord, StoreError> {
        self.append_batch(vec![record])?
            .pop()
            .ok_or_else(|| StoreError::Unavailable("store returned no record".to_string()))
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory transaction log.
#[derive(Debug, Default)]
pub struct TransactionLog {
    records: RwLock<Vec<TransactionRecord>>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for TransactionLog {
    fn append_batch(
        &self,
        mut records: Vec<TransactionRecord>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut log = self.records.write();
        let mut sequence = log.len() as u64;
        for record in &mut records {
            sequence += 1;
            record.sequence = sequence;
        }
        log.extend(records.iter().cloned());
        tracing::debug!(count = records.len(), last_sequence = sequence, "appended transactions");
        Ok(records)
    }

    fn all_records(&self) -> Vec<TransactionRecord> {
        self.records.read().clone()
    }

    fn records_for_account(&self, account_id: AccountId) -> Vec<TransactionRecord> {
        self.records
            .read()
            .iter()
            .filter(|record| record.account_id == account_id)
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}
