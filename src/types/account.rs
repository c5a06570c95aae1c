//! Account record and balance mutation rules
//!
//! The account owns its balance exclusively: every mutation goes through the
//! methods on this type, and every method upholds the core invariant that a
//! balance is never written negative. Withdrawal feasibility is a pure
//! predicate (`can_withdraw`) so callers can pre-check without mutating.
//!
//! Timestamps are injected by the caller (the engines hold the clock), which
//! keeps these rules deterministic under test.

use crate::types::money::round_money;
use crate::types::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product type of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Savings,
    Checking,
    FixedDeposit,
    Current,
    Business,
    Student,
    SeniorCitizen,
}

/// Lifecycle status of an account
///
/// Accounts are created `PendingApproval` and become `Active` on staff
/// approval. The remaining states are reached through administrative action;
/// the ledger only enforces that non-active accounts reject withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    PendingApproval,
    Active,
    Suspended,
    Closed,
    Frozen,
    UnderReview,
}

/// Optional per-account terms, applied administratively after opening
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountTerms {
    /// Annual interest rate in percent, e.g. 2.5 for 2.5%
    pub interest_rate: Option<Decimal>,
    /// Balance floor enforced by withdrawal feasibility
    pub minimum_balance: Option<Decimal>,
    /// Stored for the external limit-enforcement layer
    pub daily_transaction_limit: Option<Decimal>,
    /// Stored for the external limit-enforcement layer
    pub monthly_transaction_limit: Option<Decimal>,
}

/// A single bank account and its balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account number, immutable after creation
    pub account_number: String,
    /// Owning customer, by identity-layer id
    pub customer_id: String,
    /// Product type
    pub account_type: AccountType,
    /// Lifecycle status
    pub status: AccountStatus,
    /// Current balance; never negative once persisted
    pub balance: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// Annual interest rate in percent, if interest-bearing
    pub interest_rate: Option<Decimal>,
    /// Balance floor for withdrawals, if configured
    pub minimum_balance: Option<Decimal>,
    /// Stored limit, enforced externally
    pub daily_transaction_limit: Option<Decimal>,
    /// Stored limit, enforced externally
    pub monthly_transaction_limit: Option<Decimal>,
    /// When the account was opened
    pub opening_date: DateTime<Utc>,
    /// Stamped on every balance mutation
    pub last_activity_date: DateTime<Utc>,
    /// Staff principal that approved the account
    pub approved_by: Option<String>,
    /// When the account was approved
    pub approved_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Create a new account pending approval, with a zero balance
    pub fn new(
        account_number: impl Into<String>,
        customer_id: impl Into<String>,
        account_type: AccountType,
        currency: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Account {
            account_number: account_number.into(),
            customer_id: customer_id.into(),
            account_type,
            status: AccountStatus::PendingApproval,
            balance: Decimal::ZERO,
            currency: currency.into(),
            interest_rate: None,
            minimum_balance: None,
            daily_transaction_limit: None,
            monthly_transaction_limit: None,
            opening_date: now,
            last_activity_date: now,
            approved_by: None,
            approved_at: None,
        }
    }

    /// The effective balance floor: the configured minimum, or zero
    ///
    /// Treating an unconfigured minimum as a floor of zero is what keeps
    /// balances non-negative under any withdrawal sequence.
    fn balance_floor(&self) -> Decimal {
        self.minimum_balance.unwrap_or(Decimal::ZERO)
    }

    /// Check whether a withdrawal of `amount` is feasible
    ///
    /// Pure predicate, used both standalone and inside [`Account::withdraw`].
    /// Returns false if the account is not active, or if the balance after
    /// the debit would fall below the configured minimum (or below zero when
    /// no minimum is set).
    pub fn can_withdraw(&self, amount: Decimal) -> bool {
        if self.status != AccountStatus::Active {
            return false;
        }
        match self.balance.checked_sub(amount) {
            Some(remaining) => remaining >= self.balance_floor(),
            None => false,
        }
    }

    /// Debit `amount` from the balance
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` if `amount` is not positive
    /// * `InvalidOperation` if [`Account::can_withdraw`] is false; the
    ///   balance is untouched in that case
    pub fn withdraw(&mut self, amount: Decimal, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount("withdrawal", amount));
        }
        if !self.can_withdraw(amount) {
            return Err(LedgerError::invalid_operation(format!(
                "cannot withdraw {} from account {} (status {:?}, balance {}, minimum {})",
                amount,
                self.account_number,
                self.status,
                self.balance,
                self.balance_floor(),
            )));
        }

        // can_withdraw already proved the subtraction is in range
        self.balance -= amount;
        self.last_activity_date = now;
        Ok(())
    }

    /// Credit `amount` to the balance
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` if `amount` is not positive
    /// * `ArithmeticOverflow` at the limits of `Decimal` range
    pub fn deposit(&mut self, amount: Decimal, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount("deposit", amount));
        }

        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::overflow("deposit", &self.account_number))?;
        self.last_activity_date = now;
        Ok(())
    }

    /// Apply one period of interest to the balance
    ///
    /// No-op unless a positive interest rate is configured; otherwise the
    /// balance grows by `balance * rate / 100`, rounded HALF_UP to 2 decimal
    /// places. At-most-once-per-period is the external scheduler's
    /// responsibility: calling this twice accrues twice.
    ///
    /// # Returns
    ///
    /// The interest credited (zero for the no-op case).
    pub fn accrue_interest(&mut self, now: DateTime<Utc>) -> Result<Decimal, LedgerError> {
        let rate = match self.interest_rate {
            Some(rate) if rate > Decimal::ZERO => rate,
            _ => return Ok(Decimal::ZERO),
        };

        let interest = self
            .balance
            .checked_mul(rate)
            .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
            .map(round_money)
            .ok_or_else(|| LedgerError::overflow("interest accrual", &self.account_number))?;

        self.balance = self
            .balance
            .checked_add(interest)
            .ok_or_else(|| LedgerError::overflow("interest accrual", &self.account_number))?;
        self.last_activity_date = now;
        Ok(interest)
    }

    /// True iff a minimum balance is configured and the balance is below it
    pub fn is_overdraft(&self) -> bool {
        match self.minimum_balance {
            Some(minimum) => self.balance < minimum,
            None => false,
        }
    }

    /// Approve a pending account, recording the approver and timestamp
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` if the account is not `PendingApproval`
    pub fn approve(&mut self, staff_id: &str, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != AccountStatus::PendingApproval {
            return Err(LedgerError::invalid_operation(format!(
                "account {} is not pending approval (status {:?})",
                self.account_number, self.status
            )));
        }

        self.status = AccountStatus::Active;
        self.approved_by = Some(staff_id.to_string());
        self.approved_at = Some(now);
        Ok(())
    }

    /// Apply administratively configured terms
    pub fn apply_terms(&mut self, terms: AccountTerms) {
        self.interest_rate = terms.interest_rate;
        self.minimum_balance = terms.minimum_balance;
        self.daily_transaction_limit = terms.daily_transaction_limit;
        self.monthly_transaction_limit = terms.monthly_transaction_limit;
    }
}
