use std::collections::HashMap;
use std::io::Read;

use anyhow::Result;
use serde::Deserialize;
use uuid::Uuid;

use crate::application::{ErrorKind, LedgerError, LedgerService, OwnerDirectory};
use crate::domain::{AccountId, OwnerId};

/// One line of an operation script.
///
/// Header: `op,user,account,target,amount`
#[derive(Debug, Clone, Deserialize)]
struct ScriptRow {
    op: String,
    user: String,
    #[serde(default)]
    account: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    amount: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOp {
    /// Declare a user label and register it as a known owner
    Owner,
    /// Open an account for a user
    Open,
    Deposit,
    Withdraw,
    Transfer,
}

impl ScriptOp {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "owner" => Some(ScriptOp::Owner),
            "open" => Some(ScriptOp::Open),
            "deposit" => Some(ScriptOp::Deposit),
            "withdraw" => Some(ScriptOp::Withdraw),
            "transfer" => Some(ScriptOp::Transfer),
            _ => None,
        }
    }
}

/// Result of running a script
#[derive(Debug, Clone, Default)]
pub struct ScriptReport {
    pub applied: usize,
    pub errors: Vec<ScriptError>,
}

/// A line that could not be applied
#[derive(Debug, Clone)]
pub struct ScriptError {
    pub line: usize,
    /// Set when the ledger itself rejected the operation
    pub kind: Option<ErrorKind>,
    pub error: String,
}

/// Replays a CSV operation script against a ledger service.
///
/// User and account labels are mapped to ids as they are first seen. A label
/// that was never declared (`owner`) or opened (`open`) still gets a stable id,
/// so the ledger reports it as an unknown owner or missing account.
pub struct ScriptRunner<'a> {
    service: &'a LedgerService,
    directory: &'a OwnerDirectory,
    users: HashMap<String, OwnerId>,
    accounts: HashMap<(String, String), AccountId>,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(service: &'a LedgerService, directory: &'a OwnerDirectory) -> Self {
        Self {
            service,
            directory,
            users: HashMap::new(),
            accounts: HashMap::new(),
        }
    }

    pub fn run<R: Read>(&mut self, reader: R) -> Result<ScriptReport> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .comment(Some(b'#'))
            .from_reader(reader);
        let mut report = ScriptReport::default();

        for (line_num, result) in csv_reader.deserialize::<ScriptRow>().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    report.errors.push(ScriptError {
                        line,
                        kind: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            match self.apply(&row) {
                Ok(()) => report.applied += 1,
                Err(error) => {
                    tracing::debug!(line, error = %error.error, "script line rejected");
                    report.errors.push(ScriptError { line, ..error });
                }
            }
        }

        Ok(report)
    }

    /// Id for a user label, declared or not.
    pub fn user_id(&mut self, label: &str) -> OwnerId {
        *self
            .users
            .entry(label.to_string())
            .or_insert_with(Uuid::new_v4)
    }

    /// Id for an account label of a user, opened or not.
    pub fn account_id(&mut self, user: &str, name: &str) -> AccountId {
        *self
            .accounts
            .entry((user.to_string(), name.to_string()))
            .or_insert_with(Uuid::new_v4)
    }

    /// `user/account` labels of every account the script referred to, keyed by id
    pub fn account_labels(&self) -> HashMap<AccountId, String> {
        self.accounts
            .iter()
            .map(|((user, name), id)| (*id, format!("{}/{}", user, name)))
            .collect()
    }

    fn apply(&mut self, row: &ScriptRow) -> Result<(), ScriptError> {
        let op = ScriptOp::from_str(&row.op).ok_or_else(|| ScriptError {
            line: 0,
            kind: None,
            error: format!(
                "Invalid op '{}'. Valid ops: owner, open, deposit, withdraw, transfer",
                row.op
            ),
        })?;
        if row.user.is_empty() {
            return Err(ScriptError {
                line: 0,
                kind: None,
                error: "user is required".to_string(),
            });
        }

        let user = self.user_id(&row.user);
        match op {
            ScriptOp::Owner => {
                self.directory.insert(user);
            }
            ScriptOp::Open => {
                let account = self
                    .service
                    .create_account(user, row.account.clone(), &row.amount)
                    .map_err(ledger_error)?;
                self.accounts
                    .insert((row.user.clone(), row.account.clone()), account.id);
            }
            ScriptOp::Deposit => {
                let account = self.account_id(&row.user, &row.account);
                self.service
                    .deposit(account, user, &row.amount)
                    .map_err(ledger_error)?;
            }
            ScriptOp::Withdraw => {
                let account = self.account_id(&row.user, &row.account);
                self.service
                    .withdraw(account, user, &row.amount)
                    .map_err(ledger_error)?;
            }
            ScriptOp::Transfer => {
                let from = self.account_id(&row.user, &row.account);
                let (target_user, target_account) = match row.target.split_once('/') {
                    Some((target_user, target_account)) => (target_user, target_account),
                    None => (row.user.as_str(), row.target.as_str()),
                };
                let to = self.account_id(target_user, target_account);
                self.service
                    .transfer(user, from, to, &row.amount)
                    .map_err(ledger_error)?;
            }
        }
        Ok(())
    }
}

fn ledger_error(err: LedgerError) -> ScriptError {
    ScriptError {
        line: 0,
        kind: Some(err.kind()),
        error: err.to_string(),
    }
}
