//! CSV format handling for movement records and account reports
//!
//! This module centralizes the CSV format concerns of the replay binary:
//! - CsvMovement structure for deserialization
//! - Conversion from CSV rows to movement records
//! - Account report serialization
//!
//! All functions are pure (no file I/O) for easy testing.

use crate::types::{Account, TransactionType};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV row structure for deserialization
///
/// Matches the input format with columns: type, from, to, amount. The
/// account columns are aliases chosen by whoever wrote the file; the replay
/// driver maps them to engine-generated account numbers.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvMovement {
    #[serde(rename = "type")]
    pub movement_type: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: String,
}

/// A parsed movement row, ready for the replay driver
#[derive(Debug, Clone, PartialEq)]
pub struct MovementRecord {
    pub movement_type: TransactionType,
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Decimal,
}

/// Convert a CsvMovement to a MovementRecord
///
/// Parses the movement type and amount, and validates that the account
/// aliases required by the type are present and non-empty.
pub fn convert_movement(row: CsvMovement) -> Result<MovementRecord, String> {
    let movement_type = match row.movement_type.to_lowercase().as_str() {
        "deposit" => TransactionType::Deposit,
        "withdrawal" => TransactionType::Withdrawal,
        "transfer" => TransactionType::Transfer,
        other => return Err(format!("Invalid movement type: '{}'", other)),
    };

    let amount = Decimal::from_str(row.amount.trim())
        .map_err(|_| format!("Invalid amount '{}'", row.amount))?;

    let from = row.from.filter(|alias| !alias.trim().is_empty());
    let to = row.to.filter(|alias| !alias.trim().is_empty());

    match movement_type {
        TransactionType::Deposit if to.is_none() => {
            return Err("deposit requires a 'to' account".to_string());
        }
        TransactionType::Withdrawal if from.is_none() => {
            return Err("withdrawal requires a 'from' account".to_string());
        }
        TransactionType::Transfer if from.is_none() || to.is_none() => {
            return Err("transfer requires both 'from' and 'to' accounts".to_string());
        }
        _ => {}
    }

    Ok(MovementRecord {
        movement_type,
        from,
        to,
        amount,
    })
}

/// Write account states as CSV
///
/// Columns: account, customer, status, balance. Callers pass accounts in
/// the order they should appear.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["account", "customer", "status", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for account in accounts {
        let status = format!("{:?}", account.status);
        let balance = account.balance.to_string();
        writer
            .write_record([
                account.account_number.as_str(),
                account.customer_id.as_str(),
                status.as_str(),
                balance.as_str(),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush CSV output: {}", e))?;
    Ok(())
}
