//! Transaction records and the transaction state machine
//!
//! A transaction is an append-only ledger record: its amount is fixed at
//! creation and its status only ever advances forward through
//! `PENDING -> PROCESSING -> {COMPLETED, FAILED, CANCELLED}`, with
//! `COMPLETED -> REVERSED` as the one administrative follow-on transition.
//! Records are never deleted, including failed ones.

use crate::types::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kinds of ledger transactions
///
/// `Deposit`, `Withdrawal`, and `Transfer` are submitted through the
/// transaction engine. The remaining kinds exist for records written by
/// external flows (card charges, refunds, fee postings) against the same
/// ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
    Refund,
    Charge,
    Interest,
    Fee,
}

/// Status of a transaction
///
/// `Pending` and `Processing` are the only non-terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Reversed,
}

impl TransactionStatus {
    /// True iff the engine will never mutate a transaction in this state
    /// again (the explicit `Completed -> Reversed` administrative path
    /// excepted)
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending | TransactionStatus::Processing)
    }
}

/// A money movement request submitted to the transaction engine
///
/// The request carries caller intent only; the engine assigns the
/// transaction id and drives the record through its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementRequest {
    /// One of `Deposit`, `Withdrawal`, `Transfer`
    pub movement_type: TransactionType,
    /// Source account number; required for withdrawals and transfers
    pub from_account: Option<String>,
    /// Destination account number; required for deposits and transfers
    pub to_account: Option<String>,
    /// Amount to move; must be positive
    pub amount: Decimal,
    /// Free-text description, carried onto the record
    pub description: String,
}

/// A single ledger transaction record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction id, generated at creation, immutable
    pub transaction_id: String,
    /// Source account number, if any
    pub from_account: Option<String>,
    /// Destination account number, if any
    pub to_account: Option<String>,
    /// Kind of movement
    pub transaction_type: TransactionType,
    /// Amount moved; fixed once the record exists
    pub amount: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// Human-readable description; failure reasons are appended here
    pub description: String,
    /// Current status
    pub status: TransactionStatus,
    /// When the record was created
    pub transaction_date: DateTime<Utc>,
    /// When processing began
    pub processed_date: Option<DateTime<Utc>>,
    /// Staff principal that drove processing, if any
    pub processed_by: Option<String>,
    /// External reference, if any
    pub reference_number: Option<String>,
    /// Fee charged on top of the amount; reporting only, settlement is
    /// out of scope
    pub fee_amount: Decimal,
    /// Exchange rate applied, 1 for same-currency movements
    pub exchange_rate: Decimal,
}

impl Transaction {
    /// Create a new pending transaction record
    pub fn new(
        transaction_id: impl Into<String>,
        from_account: Option<String>,
        to_account: Option<String>,
        transaction_type: TransactionType,
        amount: Decimal,
        currency: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Transaction {
            transaction_id: transaction_id.into(),
            from_account,
            to_account,
            transaction_type,
            amount,
            currency: currency.into(),
            description: description.into(),
            status: TransactionStatus::Pending,
            transaction_date: now,
            processed_date: None,
            processed_by: None,
            reference_number: None,
            fee_amount: Decimal::ZERO,
            exchange_rate: Decimal::ONE,
        }
    }

    /// True iff this is a transfer with both accounts present
    pub fn is_transfer(&self) -> bool {
        self.transaction_type == TransactionType::Transfer
            && self.from_account.is_some()
            && self.to_account.is_some()
    }

    /// Amount plus fee; a derived read used for reporting
    pub fn total_amount(&self) -> Decimal {
        self.amount + self.fee_amount
    }

    /// Move to `Processing`, stamping the processed timestamp
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` unless the record is `Pending`
    pub fn process(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != TransactionStatus::Pending {
            return Err(self.transition_error("process"));
        }
        self.status = TransactionStatus::Processing;
        self.processed_date = Some(now);
        Ok(())
    }

    /// Move to the terminal `Completed` state
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` unless the record is `Processing`
    pub fn complete(&mut self) -> Result<(), LedgerError> {
        if self.status != TransactionStatus::Processing {
            return Err(self.transition_error("complete"));
        }
        self.status = TransactionStatus::Completed;
        Ok(())
    }

    /// Move to the terminal `Failed` state, appending the reason to the
    /// description
    ///
    /// Failure is terminal: the engine never retries; a caller that wants a
    /// retry must submit a new transaction.
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` if the record is already terminal
    pub fn fail(&mut self, reason: &str) -> Result<(), LedgerError> {
        if self.status.is_terminal() {
            return Err(self.transition_error("fail"));
        }
        self.status = TransactionStatus::Failed;
        self.description = format!("{} - FAILED: {}", self.description, reason);
        Ok(())
    }

    /// Move to the terminal `Cancelled` state
    ///
    /// Only reachable before processing begins; once a record is
    /// `Processing` it runs to `Completed` or `Failed`.
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` unless the record is `Pending`
    pub fn cancel(&mut self) -> Result<(), LedgerError> {
        if self.status != TransactionStatus::Pending {
            return Err(self.transition_error("cancel"));
        }
        self.status = TransactionStatus::Cancelled;
        Ok(())
    }

    /// Administratively mark a completed transaction reversed
    ///
    /// The compensating money movement is owned by an external workflow;
    /// this only records the fact on the original transaction.
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` unless the record is `Completed`
    pub fn reverse(&mut self) -> Result<(), LedgerError> {
        if self.status != TransactionStatus::Completed {
            return Err(self.transition_error("reverse"));
        }
        self.status = TransactionStatus::Reversed;
        Ok(())
    }

    fn transition_error(&self, attempted: &str) -> LedgerError {
        LedgerError::invalid_operation(format!(
            "cannot {} transaction {} in status {:?}",
            attempted, self.transaction_id, self.status
        ))
    }
}
