//! Loan origination and repayment engine
//!
//! Loans flow independently of the transaction engine: disbursement and
//! repayment update Loan and LoanPayment records only, never account
//! balances. The schedule arithmetic lives on the `Loan` type; this engine
//! owns the stores, the identifier generators, and the payment audit trail.
//!
//! Like the transaction engine, per-loan work is serialized by the loan's
//! own mutation lock, so concurrent repayments cannot both clear against a
//! stale outstanding balance.

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::core::clock::Clock;
use crate::core::ids::IdGenerator;
use crate::types::{
    LedgerError, Loan, LoanApplication, LoanPayment, PaymentType, Principal,
};

fn lock_loan(handle: &Mutex<Loan>) -> MutexGuard<'_, Loan> {
    handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Orchestrates the loan lifecycle and its payment records
///
/// Cheap to clone; clones share the same stores.
#[derive(Clone)]
pub struct LoanEngine {
    loans: Arc<DashMap<String, Arc<Mutex<Loan>>>>,
    payments: Arc<DashMap<String, LoanPayment>>,
    loan_ids: Arc<IdGenerator>,
    payment_ids: Arc<IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl LoanEngine {
    /// Create an engine with empty stores and the given clock
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        LoanEngine {
            loans: Arc::new(DashMap::new()),
            payments: Arc::new(DashMap::new()),
            loan_ids: Arc::new(IdGenerator::new("LN")),
            payment_ids: Arc::new(IdGenerator::new("PMT")),
            clock,
        }
    }

    /// Originate a loan for a customer
    ///
    /// Computes the amortized schedule once, here; see [`Loan::new`]. The
    /// loan number is generated internally and the loan starts
    /// `PendingApproval`.
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` unless the principal is an active, KYC-verified
    ///   customer
    /// * `InvalidAmount` / `InvalidOperation` for out-of-range principal,
    ///   rate, or term
    pub fn originate(
        &self,
        customer: &Principal,
        application: LoanApplication,
    ) -> Result<Loan, LedgerError> {
        if !customer.is_verified_customer() {
            return Err(LedgerError::invalid_operation(format!(
                "principal '{}' is not an active KYC-verified customer",
                customer.id
            )));
        }

        let loan = Loan::new(
            self.loan_ids.next_id(),
            customer.id.clone(),
            application,
            self.clock.now(),
        )?;
        self.loans.insert(
            loan.loan_number.clone(),
            Arc::new(Mutex::new(loan.clone())),
        );
        info!(
            loan = %loan.loan_number,
            customer = %customer.id,
            principal = %loan.principal,
            monthly_payment = %loan.monthly_payment,
            "loan originated, pending approval"
        );
        Ok(loan)
    }

    /// Approve a pending loan
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` unless `staff` is active staff and the loan is
    ///   pending approval
    pub fn approve(&self, loan_number: &str, staff: &Principal) -> Result<Loan, LedgerError> {
        if !staff.is_active_staff() {
            return Err(LedgerError::invalid_operation(format!(
                "principal '{}' is not active staff",
                staff.id
            )));
        }
        let handle = self.handle(loan_number)?;
        let mut loan = lock_loan(&handle);
        loan.approve(&staff.id, self.clock.now())?;
        info!(loan = %loan_number, staff = %staff.id, "loan approved");
        Ok(loan.clone())
    }

    /// Reject a pending loan
    pub fn reject(&self, loan_number: &str) -> Result<Loan, LedgerError> {
        let handle = self.handle(loan_number)?;
        let mut loan = lock_loan(&handle);
        loan.reject()?;
        info!(loan = %loan_number, "loan rejected");
        Ok(loan.clone())
    }

    /// Disburse an approved loan, fixing its due date
    pub fn disburse(&self, loan_number: &str) -> Result<Loan, LedgerError> {
        let handle = self.handle(loan_number)?;
        let mut loan = lock_loan(&handle);
        loan.disburse(self.clock.now())?;
        info!(loan = %loan_number, due = ?loan.due_date, "loan disbursed");
        Ok(loan.clone())
    }

    /// Apply a repayment against a loan
    ///
    /// Every attempt from here on leaves a durable payment record: a
    /// successful payment completes with a remaining-balance snapshot, a
    /// rejected one (overpayment, loan not disbursed) is recorded FAILED
    /// and the error surfaced. Reaching exactly zero flips the loan to
    /// `PaidOff`.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` for a non-positive amount (no record is written)
    /// * `InvalidOperation` for an overpayment or a non-repayable loan
    pub fn make_payment(
        &self,
        loan_number: &str,
        amount: Decimal,
        payment_type: PaymentType,
    ) -> Result<LoanPayment, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount("loan payment", amount));
        }
        let handle = self.handle(loan_number)?;

        let now = self.clock.now();
        let mut payment = LoanPayment::new(
            self.payment_ids.next_id(),
            loan_number,
            amount,
            payment_type,
            now,
        );
        payment.process(now)?;

        let mut loan = lock_loan(&handle);
        match loan.apply_payment(amount) {
            Ok(remaining) => {
                payment.remaining_balance = Some(remaining);
                payment.complete()?;
                self.payments
                    .insert(payment.payment_number.clone(), payment.clone());
                info!(
                    loan = %loan_number,
                    payment = %payment.payment_number,
                    %amount,
                    %remaining,
                    paid_off = %(loan.status == crate::types::LoanStatus::PaidOff),
                    "loan payment applied"
                );
                Ok(payment)
            }
            Err(err) => {
                payment.fail()?;
                self.payments
                    .insert(payment.payment_number.clone(), payment.clone());
                warn!(loan = %loan_number, error = %err, "loan payment rejected");
                Err(err)
            }
        }
    }

    /// True iff the loan is past its due date and still repayable
    ///
    /// Detection only; marking a loan defaulted is a separate
    /// administrative call.
    pub fn is_overdue(&self, loan_number: &str) -> Result<bool, LedgerError> {
        let handle = self.handle(loan_number)?;
        let loan = lock_loan(&handle);
        Ok(loan.is_overdue(self.clock.now()))
    }

    /// Administratively mark a loan defaulted
    pub fn mark_defaulted(&self, loan_number: &str) -> Result<Loan, LedgerError> {
        let handle = self.handle(loan_number)?;
        let mut loan = lock_loan(&handle);
        loan.mark_defaulted()?;
        warn!(loan = %loan_number, "loan marked defaulted");
        Ok(loan.clone())
    }

    /// Point-in-time copy of one loan
    pub fn loan(&self, loan_number: &str) -> Result<Loan, LedgerError> {
        let handle = self.handle(loan_number)?;
        let loan = lock_loan(&handle);
        Ok(loan.clone())
    }

    /// Point-in-time copies of all loans, sorted by loan number
    pub fn loans(&self) -> Vec<Loan> {
        let mut loans: Vec<Loan> = self
            .loans
            .iter()
            .map(|entry| lock_loan(entry.value()).clone())
            .collect();
        loans.sort_by(|a, b| a.loan_number.cmp(&b.loan_number));
        loans
    }

    /// All payment records for a loan, newest first
    ///
    /// Ties on the timestamp are broken by payment number, descending.
    pub fn payments_for_loan(&self, loan_number: &str) -> Vec<LoanPayment> {
        let mut payments: Vec<LoanPayment> = self
            .payments
            .iter()
            .filter(|entry| entry.value().loan_number == loan_number)
            .map(|entry| entry.value().clone())
            .collect();
        payments.sort_by_key(|payment| {
            std::cmp::Reverse((payment.payment_date, payment.payment_number.clone()))
        });
        payments
    }

    fn handle(&self, loan_number: &str) -> Result<Arc<Mutex<Loan>>, LedgerError> {
        self.loans
            .get(loan_number)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::not_found("loan", loan_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::types::{LoanStatus, LoanType, PaymentStatus};
    use chrono::{Duration, TimeZone, Utc};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn engine_with_clock() -> (LoanEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        (LoanEngine::new(clock.clone()), clock)
    }

    fn personal_application() -> LoanApplication {
        LoanApplication::new(LoanType::Personal, dec("10000"), dec("12"), 12)
    }

    fn disbursed_loan(engine: &LoanEngine) -> String {
        let loan = engine
            .originate(&Principal::customer("cust-1", true), personal_application())
            .unwrap();
        engine
            .approve(&loan.loan_number, &Principal::staff("staff-1"))
            .unwrap();
        engine.disburse(&loan.loan_number).unwrap();
        loan.loan_number
    }

    #[test]
    fn test_originate_computes_schedule_once() {
        let (engine, _) = engine_with_clock();
        let loan = engine
            .originate(&Principal::customer("cust-1", true), personal_application())
            .unwrap();

        assert_eq!(loan.loan_number, "LN-000001");
        assert_eq!(loan.status, LoanStatus::PendingApproval);
        assert_eq!(loan.monthly_payment, dec("888.49"));
        assert_eq!(loan.total_amount, dec("10661.88"));
        assert_eq!(loan.outstanding_balance, dec("10661.88"));
    }

    #[test]
    fn test_originate_requires_verified_customer() {
        let (engine, _) = engine_with_clock();
        let result = engine.originate(
            &Principal::customer("cust-1", false),
            personal_application(),
        );
        assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));
        assert!(engine.loans().is_empty());
    }

    #[test]
    fn test_originate_rejects_small_principal() {
        let (engine, _) = engine_with_clock();
        let result = engine.originate(
            &Principal::customer("cust-1", true),
            LoanApplication::new(LoanType::Personal, dec("500"), dec("12"), 12),
        );
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[test]
    fn test_approval_requires_staff() {
        let (engine, _) = engine_with_clock();
        let loan = engine
            .originate(&Principal::customer("cust-1", true), personal_application())
            .unwrap();

        let result = engine.approve(&loan.loan_number, &Principal::customer("cust-2", true));
        assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));

        let approved = engine
            .approve(&loan.loan_number, &Principal::staff("staff-1"))
            .unwrap();
        assert_eq!(approved.status, LoanStatus::Approved);
    }

    #[test]
    fn test_reject_pending_loan() {
        let (engine, _) = engine_with_clock();
        let loan = engine
            .originate(&Principal::customer("cust-1", true), personal_application())
            .unwrap();

        let rejected = engine.reject(&loan.loan_number).unwrap();
        assert_eq!(rejected.status, LoanStatus::Rejected);

        // Terminal for this engine: no approval, no disbursement
        assert!(engine.approve(&loan.loan_number, &Principal::staff("staff-1")).is_err());
        assert!(engine.disburse(&loan.loan_number).is_err());
    }

    #[test]
    fn test_disburse_sets_due_date_from_clock() {
        let (engine, _) = engine_with_clock();
        let number = disbursed_loan(&engine);

        let loan = engine.loan(&number).unwrap();
        assert_eq!(loan.status, LoanStatus::Disbursed);
        assert_eq!(
            loan.due_date,
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unknown_loan_is_not_found() {
        let (engine, _) = engine_with_clock();
        assert!(matches!(
            engine.loan("LN-999999"),
            Err(LedgerError::NotFound { .. })
        ));
        assert!(matches!(
            engine.make_payment("LN-999999", dec("10.00"), PaymentType::Regular),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_payment_completes_with_snapshot() {
        let (engine, _) = engine_with_clock();
        let number = disbursed_loan(&engine);

        let payment = engine
            .make_payment(&number, dec("888.49"), PaymentType::Regular)
            .unwrap();

        assert_eq!(payment.payment_number, "PMT-000001");
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.remaining_balance, Some(dec("9773.39")));
        assert_eq!(
            engine.loan(&number).unwrap().outstanding_balance,
            dec("9773.39")
        );
    }

    #[test]
    fn test_full_term_of_payments_pays_off() {
        let (engine, _) = engine_with_clock();
        let number = disbursed_loan(&engine);

        for _ in 0..12 {
            engine
                .make_payment(&number, dec("888.49"), PaymentType::Regular)
                .unwrap();
        }

        let loan = engine.loan(&number).unwrap();
        assert_eq!(loan.outstanding_balance, dec("0.00"));
        assert_eq!(loan.status, LoanStatus::PaidOff);
        assert_eq!(engine.payments_for_loan(&number).len(), 12);
    }

    #[test]
    fn test_overpayment_recorded_failed_and_rejected() {
        let (engine, _) = engine_with_clock();
        let number = disbursed_loan(&engine);

        let result = engine.make_payment(&number, dec("99999.00"), PaymentType::EarlyPayoff);

        assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));
        assert_eq!(
            engine.loan(&number).unwrap().outstanding_balance,
            dec("10661.88")
        );

        let records = engine.payments_for_loan(&number);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, PaymentStatus::Failed);
        assert!(records[0].remaining_balance.is_none());
    }

    #[test]
    fn test_payment_against_pending_loan_recorded_failed() {
        let (engine, _) = engine_with_clock();
        let loan = engine
            .originate(&Principal::customer("cust-1", true), personal_application())
            .unwrap();

        let result = engine.make_payment(&loan.loan_number, dec("100.00"), PaymentType::Regular);

        assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));
        let records = engine.payments_for_loan(&loan.loan_number);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, PaymentStatus::Failed);
    }

    #[test]
    fn test_non_positive_payment_writes_no_record() {
        let (engine, _) = engine_with_clock();
        let number = disbursed_loan(&engine);

        let result = engine.make_payment(&number, dec("0.00"), PaymentType::Regular);
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
        assert!(engine.payments_for_loan(&number).is_empty());
    }

    #[test]
    fn test_is_overdue_follows_the_clock() {
        let (engine, clock) = engine_with_clock();
        let number = disbursed_loan(&engine);

        assert!(!engine.is_overdue(&number).unwrap());

        clock.advance(Duration::days(366));
        assert!(engine.is_overdue(&number).unwrap());

        // No automatic default: overdue detection alone changes nothing
        assert_eq!(engine.loan(&number).unwrap().status, LoanStatus::Disbursed);
    }

    #[test]
    fn test_mark_defaulted() {
        let (engine, clock) = engine_with_clock();
        let number = disbursed_loan(&engine);
        clock.advance(Duration::days(366));

        let loan = engine.mark_defaulted(&number).unwrap();
        assert_eq!(loan.status, LoanStatus::Defaulted);

        // Defaulted loans no longer accept payments
        let result = engine.make_payment(&number, dec("10.00"), PaymentType::Default);
        assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));
    }

    #[test]
    fn test_payments_for_loan_newest_first() {
        let (engine, clock) = engine_with_clock();
        let number = disbursed_loan(&engine);

        engine.make_payment(&number, dec("100.00"), PaymentType::Regular).unwrap();
        clock.advance(Duration::days(30));
        engine.make_payment(&number, dec("200.00"), PaymentType::Regular).unwrap();
        clock.advance(Duration::days(30));
        engine.make_payment(&number, dec("300.00"), PaymentType::Extra).unwrap();

        let amounts: Vec<Decimal> = engine
            .payments_for_loan(&number)
            .into_iter()
            .map(|payment| payment.amount)
            .collect();
        assert_eq!(amounts, vec![dec("300.00"), dec("200.00"), dec("100.00")]);
    }

    #[test]
    fn test_concurrent_payments_never_overdraw_outstanding() {
        use std::thread;

        let (engine, _) = engine_with_clock();
        let number = disbursed_loan(&engine);
        // Outstanding is 10661.88; 30 payments of 500.00 would be 15000.00,
        // so only 21 can clear (21 * 500 = 10500 <= 10661.88).
        let mut handles = vec![];
        for _ in 0..30 {
            let engine = engine.clone();
            let number = number.clone();
            handles.push(thread::spawn(move || {
                engine.make_payment(&number, dec("500.00"), PaymentType::Regular)
            }));
        }

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();

        assert_eq!(successes, 21);
        assert_eq!(
            engine.loan(&number).unwrap().outstanding_balance,
            dec("161.88")
        );
    }
}
