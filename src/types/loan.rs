//! Loan and loan payment records
//!
//! The payment schedule is computed exactly once, at construction, from
//! principal, rate, and term; `monthly_payment`, `total_amount`, and the
//! initial `outstanding_balance` are never edited independently afterwards.
//! The outstanding balance only decreases through recorded payments and can
//! reach exactly zero (flipping the loan to `PaidOff`) but never below.
//!
//! Loans are deliberately independent of the transaction engine: a
//! disbursement or repayment is not modeled as a ledger transfer.

use crate::types::money::{compound, round_money};
use crate::types::LedgerError;
use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Smallest principal the bank will lend
pub const MINIMUM_PRINCIPAL: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Longest loan term, in months
pub const MAXIMUM_TERM_MONTHS: u32 = 360;

/// Product type of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanType {
    Personal,
    Home,
    Auto,
    Business,
    Student,
    Mortgage,
    LineOfCredit,
}

/// Lifecycle status of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    PendingApproval,
    Approved,
    Disbursed,
    Active,
    Defaulted,
    PaidOff,
    Rejected,
}

/// Kind of a loan payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Regular,
    Extra,
    Late,
    Default,
    EarlyPayoff,
}

/// Status of a loan payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    /// True iff the payment record will never change again
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Cancelled
        )
    }
}

/// A loan application as submitted by the service layer
#[derive(Debug, Clone, PartialEq)]
pub struct LoanApplication {
    pub loan_type: LoanType,
    /// Principal requested; at least 1000
    pub principal: Decimal,
    /// Annual interest rate in percent
    pub annual_rate: Decimal,
    /// Term in months, 1..=360
    pub term_months: u32,
    pub collateral_value: Option<Decimal>,
    pub collateral_description: Option<String>,
    pub purpose: Option<String>,
}

impl LoanApplication {
    /// A plain application with no collateral or stated purpose
    pub fn new(loan_type: LoanType, principal: Decimal, annual_rate: Decimal, term_months: u32) -> Self {
        LoanApplication {
            loan_type,
            principal,
            annual_rate,
            term_months,
            collateral_value: None,
            collateral_description: None,
            purpose: None,
        }
    }
}

/// A single loan and its amortized schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    /// Unique loan number
    pub loan_number: String,
    /// Borrowing customer, by identity-layer id
    pub customer_id: String,
    pub loan_type: LoanType,
    /// Principal lent
    pub principal: Decimal,
    /// Annual interest rate in percent
    pub interest_rate: Decimal,
    /// Term in months
    pub term_months: u32,
    /// Fixed monthly payment, computed at construction
    pub monthly_payment: Decimal,
    /// Total payable over the term, computed at construction
    pub total_amount: Decimal,
    /// What remains to be paid; decreases only via recorded payments
    pub outstanding_balance: Decimal,
    pub status: LoanStatus,
    pub application_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub disbursement_date: Option<DateTime<Utc>>,
    /// Set at disbursement: disbursement date plus the term
    pub due_date: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub collateral_value: Option<Decimal>,
    pub collateral_description: Option<String>,
    pub purpose: Option<String>,
}

impl Loan {
    /// Create a loan pending approval, computing its payment schedule
    ///
    /// The schedule uses the standard amortization formula
    /// `M = P * (r * (1+r)^N) / ((1+r)^N - 1)` with the monthly rate
    /// `r = R/100/12`, rounded HALF_UP to 2 decimal places at the end. A
    /// zero-interest loan falls back to `M = P / N` (the formula's
    /// denominator is zero at `r = 0`).
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` if the principal is below 1000 or the rate negative
    /// * `InvalidOperation` if the term is outside 1..=360
    pub fn new(
        loan_number: impl Into<String>,
        customer_id: impl Into<String>,
        application: LoanApplication,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let loan_number = loan_number.into();

        if application.principal < MINIMUM_PRINCIPAL {
            return Err(LedgerError::invalid_amount(
                "loan principal",
                application.principal,
            ));
        }
        if application.annual_rate < Decimal::ZERO {
            return Err(LedgerError::invalid_amount(
                "loan interest rate",
                application.annual_rate,
            ));
        }
        if application.term_months < 1 || application.term_months > MAXIMUM_TERM_MONTHS {
            return Err(LedgerError::invalid_operation(format!(
                "loan term of {} months is outside 1..={}",
                application.term_months, MAXIMUM_TERM_MONTHS
            )));
        }

        let monthly_payment = monthly_payment(
            application.principal,
            application.annual_rate,
            application.term_months,
        )
        .ok_or_else(|| LedgerError::overflow("loan amortization", &loan_number))?;

        let total_amount = monthly_payment
            .checked_mul(Decimal::from(application.term_months))
            .ok_or_else(|| LedgerError::overflow("loan amortization", &loan_number))?;

        Ok(Loan {
            loan_number,
            customer_id: customer_id.into(),
            loan_type: application.loan_type,
            principal: application.principal,
            interest_rate: application.annual_rate,
            term_months: application.term_months,
            monthly_payment,
            total_amount,
            outstanding_balance: total_amount,
            status: LoanStatus::PendingApproval,
            application_date: now,
            approval_date: None,
            disbursement_date: None,
            due_date: None,
            approved_by: None,
            collateral_value: application.collateral_value,
            collateral_description: application.collateral_description,
            purpose: application.purpose,
        })
    }

    /// Approve a pending loan
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` unless the loan is `PendingApproval`
    pub fn approve(&mut self, staff_id: &str, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != LoanStatus::PendingApproval {
            return Err(self.transition_error("approve"));
        }
        self.status = LoanStatus::Approved;
        self.approved_by = Some(staff_id.to_string());
        self.approval_date = Some(now);
        Ok(())
    }

    /// Reject a pending loan
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` unless the loan is `PendingApproval`
    pub fn reject(&mut self) -> Result<(), LedgerError> {
        if self.status != LoanStatus::PendingApproval {
            return Err(self.transition_error("reject"));
        }
        self.status = LoanStatus::Rejected;
        Ok(())
    }

    /// Disburse an approved loan, setting the due date to disbursement plus
    /// the term
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` unless the loan is `Approved`
    pub fn disburse(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != LoanStatus::Approved {
            return Err(self.transition_error("disburse"));
        }
        self.status = LoanStatus::Disbursed;
        self.disbursement_date = Some(now);
        self.due_date = now.checked_add_months(Months::new(self.term_months));
        Ok(())
    }

    /// True iff the loan accepts repayments (disbursed, treated as active)
    pub fn is_repayable(&self) -> bool {
        matches!(self.status, LoanStatus::Disbursed | LoanStatus::Active)
    }

    /// Apply a repayment against the outstanding balance
    ///
    /// Overpayment is rejected outright and leaves the balance untouched.
    /// Reaching exactly zero flips the loan to `PaidOff`.
    ///
    /// # Returns
    ///
    /// The outstanding balance after the payment.
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` if the loan is not repayable or the payment
    ///   exceeds the outstanding balance
    pub fn apply_payment(&mut self, amount: Decimal) -> Result<Decimal, LedgerError> {
        if !self.is_repayable() {
            return Err(LedgerError::invalid_operation(format!(
                "loan {} is not disbursed (status {:?})",
                self.loan_number, self.status
            )));
        }
        if self.outstanding_balance < amount {
            return Err(LedgerError::invalid_operation(format!(
                "payment of {} exceeds outstanding balance {} on loan {}",
                amount, self.outstanding_balance, self.loan_number
            )));
        }

        self.outstanding_balance -= amount;
        if self.outstanding_balance <= Decimal::ZERO {
            self.status = LoanStatus::PaidOff;
        }
        Ok(self.outstanding_balance)
    }

    /// True iff the loan is repayable, has a due date, and `now` is past it
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_repayable() && self.due_date.is_some_and(|due| now > due)
    }

    /// Administratively mark a repayable loan defaulted
    ///
    /// Nothing in this engine triggers default automatically; overdue
    /// detection and the decision to default are external.
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` unless the loan is repayable
    pub fn mark_defaulted(&mut self) -> Result<(), LedgerError> {
        if !self.is_repayable() {
            return Err(self.transition_error("default"));
        }
        self.status = LoanStatus::Defaulted;
        Ok(())
    }

    fn transition_error(&self, attempted: &str) -> LedgerError {
        LedgerError::invalid_operation(format!(
            "cannot {} loan {} in status {:?}",
            attempted, self.loan_number, self.status
        ))
    }
}

/// Fixed monthly payment for the given principal, annual percentage rate,
/// and term, rounded HALF_UP to 2 decimal places
///
/// Returns `None` if an intermediate value overflows `Decimal`.
fn monthly_payment(principal: Decimal, annual_rate: Decimal, term_months: u32) -> Option<Decimal> {
    let months_per_year = Decimal::from(12u32);
    let monthly_rate = annual_rate
        .checked_div(Decimal::ONE_HUNDRED)?
        .checked_div(months_per_year)?;

    let raw = if monthly_rate > Decimal::ZERO {
        let factor = compound(monthly_rate, term_months)?;
        let numerator = principal.checked_mul(monthly_rate)?.checked_mul(factor)?;
        let denominator = factor.checked_sub(Decimal::ONE)?;
        numerator.checked_div(denominator)?
    } else {
        // The amortization formula divides by zero at r = 0
        principal.checked_div(Decimal::from(term_months))?
    };

    Some(round_money(raw))
}

/// A single repayment against a loan, append-only evidence of an
/// outstanding-balance mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanPayment {
    /// Unique payment number
    pub payment_number: String,
    /// The loan this payment belongs to
    pub loan_number: String,
    /// Amount paid; must be positive
    pub amount: Decimal,
    pub payment_date: DateTime<Utc>,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub processed_date: Option<DateTime<Utc>>,
    /// Late fee assessed; stored for reporting, settlement out of scope
    pub late_fee: Decimal,
    /// Principal portion of the payment, when the servicing layer splits it
    pub principal_portion: Option<Decimal>,
    /// Interest portion of the payment, when the servicing layer splits it
    pub interest_portion: Option<Decimal>,
    /// Outstanding balance snapshot after this payment completed
    pub remaining_balance: Option<Decimal>,
}

impl LoanPayment {
    /// Create a new pending payment record
    pub fn new(
        payment_number: impl Into<String>,
        loan_number: impl Into<String>,
        amount: Decimal,
        payment_type: PaymentType,
        now: DateTime<Utc>,
    ) -> Self {
        LoanPayment {
            payment_number: payment_number.into(),
            loan_number: loan_number.into(),
            amount,
            payment_date: now,
            payment_type,
            status: PaymentStatus::Pending,
            processed_date: None,
            late_fee: Decimal::ZERO,
            principal_portion: None,
            interest_portion: None,
            remaining_balance: None,
        }
    }

    /// Amount plus late fee; a derived read used for reporting
    pub fn total_amount(&self) -> Decimal {
        self.amount + self.late_fee
    }

    /// Move to `Processing`, stamping the processed timestamp
    pub fn process(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != PaymentStatus::Pending {
            return Err(self.transition_error("process"));
        }
        self.status = PaymentStatus::Processing;
        self.processed_date = Some(now);
        Ok(())
    }

    /// Move to the terminal `Completed` state
    pub fn complete(&mut self) -> Result<(), LedgerError> {
        if self.status != PaymentStatus::Processing {
            return Err(self.transition_error("complete"));
        }
        self.status = PaymentStatus::Completed;
        Ok(())
    }

    /// Move to the terminal `Failed` state
    pub fn fail(&mut self) -> Result<(), LedgerError> {
        if self.status.is_terminal() {
            return Err(self.transition_error("fail"));
        }
        self.status = PaymentStatus::Failed;
        Ok(())
    }

    fn transition_error(&self, attempted: &str) -> LedgerError {
        LedgerError::invalid_operation(format!(
            "cannot {} payment {} in status {:?}",
            attempted, self.payment_number, self.status
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn new_loan(principal: &str, rate: &str, term: u32) -> Loan {
        Loan::new(
            "LN-000001",
            "cust-1",
            LoanApplication::new(LoanType::Personal, dec(principal), dec(rate), term),
            epoch(),
        )
        .unwrap()
    }

    fn disbursed_loan(principal: &str, rate: &str, term: u32) -> Loan {
        let mut loan = new_loan(principal, rate, term);
        loan.approve("staff-1", epoch()).unwrap();
        loan.disburse(epoch()).unwrap();
        loan
    }

    #[test]
    fn test_amortization_reference_vector() {
        // 10000 at 12% annual over 12 months
        let loan = new_loan("10000", "12", 12);
        assert_eq!(loan.monthly_payment, dec("888.49"));
        assert_eq!(loan.total_amount, dec("10661.88"));
        assert_eq!(loan.outstanding_balance, dec("10661.88"));
    }

    #[test]
    fn test_zero_interest_falls_back_to_principal_over_term() {
        let loan = new_loan("12000", "0", 12);
        assert_eq!(loan.monthly_payment, dec("1000.00"));
        assert_eq!(loan.total_amount, dec("12000.00"));
        assert_eq!(loan.outstanding_balance, dec("12000.00"));
    }

    #[rstest]
    #[case::thirty_year_mortgage("250000", "6", 360, "1498.88")]
    #[case::five_year_auto("20000", "4.8", 60, "375.59")]
    fn test_amortization_additional_vectors(
        #[case] principal: &str,
        #[case] rate: &str,
        #[case] term: u32,
        #[case] expected_monthly: &str,
    ) {
        let loan = new_loan(principal, rate, term);
        assert_eq!(loan.monthly_payment, dec(expected_monthly));
        assert_eq!(
            loan.total_amount,
            dec(expected_monthly) * Decimal::from(term)
        );
    }

    #[test]
    fn test_principal_below_minimum_rejected() {
        let result = Loan::new(
            "LN-000001",
            "cust-1",
            LoanApplication::new(LoanType::Personal, dec("999.99"), dec("5"), 12),
            epoch(),
        );
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[test]
    fn test_negative_rate_rejected() {
        let result = Loan::new(
            "LN-000001",
            "cust-1",
            LoanApplication::new(LoanType::Personal, dec("5000"), dec("-1"), 12),
            epoch(),
        );
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[rstest]
    #[case::zero_term(0)]
    #[case::beyond_maximum(361)]
    fn test_term_out_of_range_rejected(#[case] term: u32) {
        let result = Loan::new(
            "LN-000001",
            "cust-1",
            LoanApplication::new(LoanType::Personal, dec("5000"), dec("5"), term),
            epoch(),
        );
        assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));
    }

    #[test]
    fn test_single_month_term_is_accepted() {
        let loan = new_loan("1000", "0", 1);
        assert_eq!(loan.monthly_payment, dec("1000.00"));
    }

    #[test]
    fn test_approve_then_disburse_sets_due_date() {
        let mut loan = new_loan("10000", "12", 12);

        loan.approve("staff-3", epoch()).unwrap();
        assert_eq!(loan.status, LoanStatus::Approved);
        assert_eq!(loan.approved_by.as_deref(), Some("staff-3"));
        assert_eq!(loan.approval_date, Some(epoch()));

        loan.disburse(epoch()).unwrap();
        assert_eq!(loan.status, LoanStatus::Disbursed);
        assert_eq!(loan.disbursement_date, Some(epoch()));
        assert_eq!(
            loan.due_date,
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_reject_only_from_pending() {
        let mut loan = new_loan("10000", "12", 12);
        loan.reject().unwrap();
        assert_eq!(loan.status, LoanStatus::Rejected);

        let mut approved = new_loan("10000", "12", 12);
        approved.approve("staff-1", epoch()).unwrap();
        assert!(approved.reject().is_err());
    }

    #[test]
    fn test_disburse_requires_approval() {
        let mut loan = new_loan("10000", "12", 12);
        let result = loan.disburse(epoch());
        assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));
        assert!(loan.due_date.is_none());
    }

    #[test]
    fn test_payment_reduces_outstanding() {
        let mut loan = disbursed_loan("10000", "12", 12);
        let remaining = loan.apply_payment(dec("888.49")).unwrap();
        assert_eq!(remaining, dec("9773.39"));
        assert_eq!(loan.status, LoanStatus::Disbursed);
    }

    #[test]
    fn test_payoff_at_exactly_zero() {
        let mut loan = disbursed_loan("10000", "12", 12);
        loan.outstanding_balance = dec("500.00");

        let remaining = loan.apply_payment(dec("500.00")).unwrap();

        assert_eq!(remaining, dec("0.00"));
        assert_eq!(loan.status, LoanStatus::PaidOff);
    }

    #[test]
    fn test_overpayment_rejected_and_balance_unchanged() {
        let mut loan = disbursed_loan("10000", "12", 12);
        loan.outstanding_balance = dec("500.00");

        let result = loan.apply_payment(dec("600.00"));

        assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));
        assert_eq!(loan.outstanding_balance, dec("500.00"));
        assert_eq!(loan.status, LoanStatus::Disbursed);
    }

    #[test]
    fn test_payment_against_pending_loan_rejected() {
        let mut loan = new_loan("10000", "12", 12);
        let result = loan.apply_payment(dec("100.00"));
        assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));
        assert_eq!(loan.outstanding_balance, dec("10661.88"));
    }

    #[test]
    fn test_paid_off_loan_rejects_further_payments() {
        let mut loan = disbursed_loan("10000", "12", 12);
        loan.outstanding_balance = dec("100.00");
        loan.apply_payment(dec("100.00")).unwrap();

        let result = loan.apply_payment(dec("1.00"));
        assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));
    }

    #[test]
    fn test_is_overdue() {
        let loan = disbursed_loan("10000", "12", 12);
        let before_due = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let after_due = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();

        assert!(!loan.is_overdue(before_due));
        assert!(loan.is_overdue(after_due));
    }

    #[test]
    fn test_pending_loan_is_never_overdue() {
        let loan = new_loan("10000", "12", 12);
        let far_future = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap();
        assert!(!loan.is_overdue(far_future));
    }

    #[test]
    fn test_mark_defaulted_from_disbursed_only() {
        let mut loan = disbursed_loan("10000", "12", 12);
        loan.mark_defaulted().unwrap();
        assert_eq!(loan.status, LoanStatus::Defaulted);

        let mut pending = new_loan("10000", "12", 12);
        assert!(pending.mark_defaulted().is_err());
    }

    #[test]
    fn test_payment_record_lifecycle() {
        let mut payment = LoanPayment::new("PMT-000001", "LN-000001", dec("888.49"), PaymentType::Regular, epoch());
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.late_fee, Decimal::ZERO);

        payment.process(epoch()).unwrap();
        assert_eq!(payment.status, PaymentStatus::Processing);
        assert_eq!(payment.processed_date, Some(epoch()));

        payment.complete().unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);

        // Terminal records are immutable
        assert!(payment.fail().is_err());
        assert!(payment.process(epoch()).is_err());
    }

    #[test]
    fn test_payment_total_includes_late_fee() {
        let mut payment = LoanPayment::new("PMT-000001", "LN-000001", dec("100.00"), PaymentType::Late, epoch());
        payment.late_fee = dec("15.00");
        assert_eq!(payment.total_amount(), dec("115.00"));
    }
}
