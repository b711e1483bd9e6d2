use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Account, IntegrityReport, TransactionRecord, format_money};

/// Full ledger snapshot for JSON export
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
    pub transactions: Vec<TransactionRecord>,
    pub integrity: IntegrityReport,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export the transaction log to CSV format
    pub fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let records = self.service.all_transactions();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "sequence",
            "id",
            "timestamp",
            "account_id",
            "type",
            "amount",
            "related_account_id",
        ])?;

        for record in &records {
            csv_writer.write_record(&[
                record.sequence.to_string(),
                record.id.to_string(),
                record.timestamp.to_rfc3339(),
                record.account_id.to_string(),
                record.transaction_type.as_str().to_string(),
                format_money(record.amount),
                record
                    .related_account_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(records.len())
    }

    /// Export account balances to CSV format
    pub fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.service.list_accounts();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["account_id", "owner_id", "name", "balance", "created_at"])?;

        for account in &accounts {
            csv_writer.write_record(&[
                account.id.to_string(),
                account.owner_id.to_string(),
                account.name.clone(),
                format_money(account.balance()),
                account.created_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(accounts.len())
    }

    /// Export the whole ledger as a JSON snapshot
    pub fn export_full_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let view = self.service.ledger_view();
        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            integrity: view.integrity(),
            accounts: view.accounts,
            transactions: view.records,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::application::OwnerDirectory;

    fn populated() -> LedgerService {
        let directory = Arc::new(OwnerDirectory::new());
        let alice = directory.register();
        let bob = directory.register();
        let service = LedgerService::new(directory);

        let a = service.create_account(alice, "Checking", "1000.00").unwrap();
        let b = service.create_account(bob, "Savings", "0").unwrap();
        service.transfer(alice, a.id, b.id, "300").unwrap();
        service
    }

    #[test]
    fn test_export_transactions_csv() {
        let service = populated();
        let mut out = Vec::new();

        let count = Exporter::new(&service)
            .export_transactions_csv(&mut out)
            .unwrap();
        assert_eq!(count, 3);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("sequence,id,timestamp"));
        assert!(lines[1].contains(",INITIAL_DEPOSIT,1000.00,"));
        assert!(lines[2].contains(",TRANSFER_OUT,300.00,"));
        assert!(lines[3].contains(",TRANSFER_IN,300.00,"));
    }

    #[test]
    fn test_export_balances_csv() {
        let service = populated();
        let mut out = Vec::new();

        let count = Exporter::new(&service).export_balances_csv(&mut out).unwrap();
        assert_eq!(count, 2);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(",Checking,700.00,"));
        assert!(text.contains(",Savings,300.00,"));
    }

    #[test]
    fn test_export_full_json() {
        let service = populated();
        let mut out = Vec::new();

        let snapshot = Exporter::new(&service).export_full_json(&mut out).unwrap();
        assert!(snapshot.integrity.is_healthy());

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["accounts"][0]["balance"], "700.00");
        assert_eq!(value["transactions"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["transactions"][1]["type"], "TRANSFER_OUT");
    }
}
