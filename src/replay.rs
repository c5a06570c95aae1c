//! Batch replay of movement files
//!
//! The replay driver is the binary's pipeline: it streams movement rows
//! from a CSV file, provisions an account per alias on first reference,
//! submits each movement through the transaction engine, and writes the
//! final account states as CSV.
//!
//! Rejected rows (parse errors, infeasible movements) are logged and
//! skipped; replay only fails outright for fatal I/O problems. Every
//! rejected movement still leaves its FAILED record inside the engine.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use tracing::warn;

use crate::core::TransactionEngine;
use crate::io::csv_format::{write_accounts_csv, MovementRecord};
use crate::io::reader::MovementReader;
use crate::types::{AccountType, LedgerError, Principal, TransactionType};

/// Replay a movements CSV through a fresh engine and report final balances
///
/// Account aliases in the file are mapped to engine-generated account
/// numbers on first use; each alias gets a checking account owned by a
/// same-named customer, approved by a synthetic "system" staff principal.
///
/// # Errors
///
/// Returns a message for fatal problems only (unreadable input, output
/// write failure).
pub fn replay(input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
    let engine = TransactionEngine::default();
    let reader = MovementReader::new(input_path)?;

    let mut session = ReplaySession::new(engine);
    for item in reader {
        match item {
            Ok(record) => {
                if let Err(e) = session.apply(&record) {
                    warn!(error = %e, "movement rejected");
                }
            }
            Err(e) => {
                warn!(error = %e, "row skipped");
            }
        }
    }

    write_accounts_csv(&session.engine.accounts(), output)
}

/// Replay state: the engine plus the alias-to-account-number map
struct ReplaySession {
    engine: TransactionEngine,
    accounts_by_alias: HashMap<String, String>,
    staff: Principal,
}

impl ReplaySession {
    fn new(engine: TransactionEngine) -> Self {
        ReplaySession {
            engine,
            accounts_by_alias: HashMap::new(),
            staff: Principal::staff("system"),
        }
    }

    /// Submit one movement, provisioning referenced accounts first
    fn apply(&mut self, record: &MovementRecord) -> Result<(), LedgerError> {
        let from = match &record.from {
            Some(alias) => Some(self.account_for(alias)?),
            None => None,
        };
        let to = match &record.to {
            Some(alias) => Some(self.account_for(alias)?),
            None => None,
        };

        match record.movement_type {
            TransactionType::Deposit => {
                let to = required(to)?;
                self.engine.submit_deposit(&to, record.amount, "csv replay")?;
            }
            TransactionType::Withdrawal => {
                let from = required(from)?;
                self.engine
                    .submit_withdrawal(&from, record.amount, "csv replay")?;
            }
            TransactionType::Transfer => {
                let from = required(from)?;
                let to = required(to)?;
                self.engine
                    .submit_transfer(&from, &to, record.amount, "csv replay")?;
            }
            other => {
                return Err(LedgerError::invalid_operation(format!(
                    "{:?} rows are not replayable movements",
                    other
                )));
            }
        }
        Ok(())
    }

    /// Resolve an alias, opening and approving an account on first use
    fn account_for(&mut self, alias: &str) -> Result<String, LedgerError> {
        if let Some(number) = self.accounts_by_alias.get(alias) {
            return Ok(number.clone());
        }

        let customer = Principal::customer(alias, true);
        let account = self
            .engine
            .open_account(&customer, AccountType::Checking, "USD")?;
        self.engine
            .approve_account(&account.account_number, &self.staff)?;
        self.accounts_by_alias
            .insert(alias.to_string(), account.account_number.clone());
        Ok(account.account_number)
    }
}

fn required(account: Option<String>) -> Result<String, LedgerError> {
    account.ok_or_else(|| LedgerError::invalid_operation("movement is missing a required account"))
}
