//! Transaction processing engine
//!
//! The engine orchestrates money movements over the account and transaction
//! stores: it validates a movement request, writes the transaction record,
//! and applies the balance effects as one atomic unit with respect to the
//! accounts involved.
//!
//! The central correctness contract is check-then-mutate-both-or-neither:
//! for a transfer, the source account's withdrawal feasibility is evaluated
//! before any mutation on either account, under both account locks, so a
//! doomed transfer never partially credits the destination. Locks are
//! acquired in ascending account-number order, which is what lets two
//! opposing transfers between the same pair of accounts run concurrently
//! without deadlocking.
//!
//! Failure is terminal. A rejected movement leaves a FAILED record with the
//! reason appended to its description; retries are the caller's business and
//! must be resubmitted as new transactions.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::core::account_store::{lock_account, AccountStore};
use crate::core::clock::Clock;
use crate::core::ids::IdGenerator;
use crate::core::transaction_store::TransactionStore;
use crate::types::{
    Account, AccountStatus, AccountTerms, AccountType, LedgerError, MovementRequest, Principal,
    Transaction, TransactionType,
};

/// Orchestrates account lifecycle and money movements
///
/// The engine is cheap to clone; clones share the same stores and can be
/// handed to as many threads as needed. All per-account work is serialized
/// by the account's own mutation lock.
#[derive(Clone)]
pub struct TransactionEngine {
    accounts: Arc<AccountStore>,
    transactions: Arc<TransactionStore>,
    account_ids: Arc<IdGenerator>,
    transaction_ids: Arc<IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl TransactionEngine {
    /// Create an engine with empty stores and the given clock
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        TransactionEngine {
            accounts: Arc::new(AccountStore::new()),
            transactions: Arc::new(TransactionStore::new()),
            account_ids: Arc::new(IdGenerator::new("ACC")),
            transaction_ids: Arc::new(IdGenerator::new("TXN")),
            clock,
        }
    }

    // ----- account lifecycle -----

    /// Open an account for a customer
    ///
    /// The account number is generated here; callers never supply one. The
    /// account starts `PendingApproval` with a zero balance.
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` unless the principal is an active, KYC-verified
    ///   customer
    pub fn open_account(
        &self,
        customer: &Principal,
        account_type: AccountType,
        currency: &str,
    ) -> Result<Account, LedgerError> {
        if !customer.is_verified_customer() {
            return Err(LedgerError::invalid_operation(format!(
                "principal '{}' is not an active KYC-verified customer",
                customer.id
            )));
        }

        let account = Account::new(
            self.account_ids.next_id(),
            customer.id.clone(),
            account_type,
            currency,
            self.clock.now(),
        );
        self.accounts.insert(account.clone())?;
        info!(
            account = %account.account_number,
            customer = %customer.id,
            "account opened, pending approval"
        );
        Ok(account)
    }

    /// Approve a pending account, recording the approving staff principal
    ///
    /// # Errors
    ///
    /// * `InvalidOperation` unless `staff` is active staff and the account
    ///   is pending approval
    /// * `NotFound` if the account does not exist
    pub fn approve_account(
        &self,
        account_number: &str,
        staff: &Principal,
    ) -> Result<Account, LedgerError> {
        if !staff.is_active_staff() {
            return Err(LedgerError::invalid_operation(format!(
                "principal '{}' is not active staff",
                staff.id
            )));
        }

        let handle = self.accounts.handle(account_number)?;
        let mut account = lock_account(&handle);
        account.approve(&staff.id, self.clock.now())?;
        info!(account = %account_number, staff = %staff.id, "account approved");
        Ok(account.clone())
    }

    /// Apply administratively configured terms to an account
    pub fn update_account_terms(
        &self,
        account_number: &str,
        terms: AccountTerms,
    ) -> Result<Account, LedgerError> {
        let handle = self.accounts.handle(account_number)?;
        let mut account = lock_account(&handle);
        account.apply_terms(terms);
        Ok(account.clone())
    }

    /// Administratively move an account to a new status
    ///
    /// Suspension, freezing, review, and closure are external decisions; the
    /// ledger only enforces their consequence (non-active accounts reject
    /// withdrawals).
    pub fn update_account_status(
        &self,
        account_number: &str,
        status: AccountStatus,
    ) -> Result<Account, LedgerError> {
        let handle = self.accounts.handle(account_number)?;
        let mut account = lock_account(&handle);
        account.status = status;
        info!(account = %account_number, ?status, "account status updated");
        Ok(account.clone())
    }

    /// Apply one period of interest to an account
    ///
    /// One-shot invocation driven by an external scheduler; calling twice
    /// accrues twice. Serialized against concurrent movements on the same
    /// account.
    ///
    /// # Returns
    ///
    /// The interest credited.
    pub fn accrue_interest(&self, account_number: &str) -> Result<Decimal, LedgerError> {
        let handle = self.accounts.handle(account_number)?;
        let mut account = lock_account(&handle);
        let interest = account.accrue_interest(self.clock.now())?;
        if interest > Decimal::ZERO {
            debug!(account = %account_number, %interest, "interest accrued");
        }
        Ok(interest)
    }

    /// Point-in-time copy of one account
    pub fn account(&self, account_number: &str) -> Result<Account, LedgerError> {
        self.accounts.snapshot(account_number)
    }

    /// Point-in-time copies of all accounts, sorted by account number
    pub fn accounts(&self) -> Vec<Account> {
        self.accounts.snapshots()
    }

    // ----- money movements -----

    /// Submit a deposit into `to_account`
    pub fn submit_deposit(
        &self,
        to_account: &str,
        amount: Decimal,
        description: &str,
    ) -> Result<Transaction, LedgerError> {
        self.submit(MovementRequest {
            movement_type: TransactionType::Deposit,
            from_account: None,
            to_account: Some(to_account.to_string()),
            amount,
            description: description.to_string(),
        })
    }

    /// Submit a withdrawal from `from_account`
    pub fn submit_withdrawal(
        &self,
        from_account: &str,
        amount: Decimal,
        description: &str,
    ) -> Result<Transaction, LedgerError> {
        self.submit(MovementRequest {
            movement_type: TransactionType::Withdrawal,
            from_account: Some(from_account.to_string()),
            to_account: None,
            amount,
            description: description.to_string(),
        })
    }

    /// Submit a transfer between two accounts
    pub fn submit_transfer(
        &self,
        from_account: &str,
        to_account: &str,
        amount: Decimal,
        description: &str,
    ) -> Result<Transaction, LedgerError> {
        self.submit(MovementRequest {
            movement_type: TransactionType::Transfer,
            from_account: Some(from_account.to_string()),
            to_account: Some(to_account.to_string()),
            amount,
            description: description.to_string(),
        })
    }

    /// Submit a money movement request
    ///
    /// The submission contract:
    ///
    /// 1. The amount must be positive.
    /// 2. The accounts required by the movement type must be present
    ///    (transfer: both; deposit: destination; withdrawal: source).
    /// 3. A transaction record is created in `Pending` with a fresh id.
    /// 4. The record moves to `Processing`, stamping the processed
    ///    timestamp.
    /// 5. Balance effects are applied atomically across the accounts
    ///    involved; on success the record completes, on rejection it fails
    ///    with the reason and no balance is mutated anywhere.
    ///
    /// Steps 1 and 2 reject before any record exists; from step 3 onward
    /// every outcome leaves a durable record.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` for a non-positive amount
    /// * `InvalidOperation` for a missing required account, an unsupported
    ///   movement type, or an infeasible debit
    /// * `NotFound` if a referenced account does not exist
    pub fn submit(&self, request: MovementRequest) -> Result<Transaction, LedgerError> {
        if request.amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(
                "movement submission",
                request.amount,
            ));
        }
        self.validate_required_accounts(&request)?;

        let mut transaction = Transaction::new(
            self.transaction_ids.next_id(),
            request.from_account.clone(),
            request.to_account.clone(),
            request.movement_type,
            request.amount,
            "USD",
            request.description.clone(),
            self.clock.now(),
        );
        self.transactions.insert(transaction.clone())?;
        debug!(
            transaction = %transaction.transaction_id,
            movement = ?request.movement_type,
            amount = %request.amount,
            "movement submitted"
        );

        transaction.process(self.clock.now())?;
        self.transactions.put(transaction.clone());

        match self.apply_effects(&mut transaction) {
            Ok(()) => Ok(transaction),
            Err(err) => {
                // Balance effects were rejected before any mutation; record
                // the failure durably and surface the error.
                transaction.fail(&err.to_string())?;
                self.transactions.put(transaction.clone());
                warn!(
                    transaction = %transaction.transaction_id,
                    error = %err,
                    "movement failed"
                );
                Err(err)
            }
        }
    }

    fn validate_required_accounts(&self, request: &MovementRequest) -> Result<(), LedgerError> {
        match request.movement_type {
            TransactionType::Deposit => {
                if request.to_account.is_none() {
                    return Err(LedgerError::invalid_operation(
                        "deposit requires a destination account",
                    ));
                }
            }
            TransactionType::Withdrawal => {
                if request.from_account.is_none() {
                    return Err(LedgerError::invalid_operation(
                        "withdrawal requires a source account",
                    ));
                }
            }
            TransactionType::Transfer => {
                match (&request.from_account, &request.to_account) {
                    (Some(from), Some(to)) if from == to => {
                        return Err(LedgerError::invalid_operation(
                            "transfer requires two distinct accounts",
                        ));
                    }
                    (Some(_), Some(_)) => {}
                    _ => {
                        return Err(LedgerError::invalid_operation(
                            "transfer requires both source and destination accounts",
                        ));
                    }
                }
            }
            other => {
                return Err(LedgerError::invalid_operation(format!(
                    "{:?} records are written by their owning flow, not submitted as movements",
                    other
                )));
            }
        }
        Ok(())
    }

    /// Apply balance effects for a processing transaction
    ///
    /// On success the record is completed and persisted while the account
    /// locks are still held, so no observer can see moved balances next to a
    /// non-completed record. On rejection nothing has been mutated and the
    /// caller persists the failure after the locks are gone.
    fn apply_effects(&self, transaction: &mut Transaction) -> Result<(), LedgerError> {
        let amount = transaction.amount;
        let now = self.clock.now();

        match transaction.transaction_type {
            TransactionType::Deposit => {
                let to_number = required_account(transaction.to_account.as_deref())?;
                let handle = self.accounts.handle(to_number)?;
                let mut account = lock_account(&handle);
                account.deposit(amount, now)?;
                transaction.complete()?;
                self.transactions.put(transaction.clone());
            }
            TransactionType::Withdrawal => {
                let from_number = required_account(transaction.from_account.as_deref())?;
                let handle = self.accounts.handle(from_number)?;
                let mut account = lock_account(&handle);
                account.withdraw(amount, now)?;
                transaction.complete()?;
                self.transactions.put(transaction.clone());
            }
            TransactionType::Transfer => {
                let from_number = required_account(transaction.from_account.as_deref())?;
                let to_number = required_account(transaction.to_account.as_deref())?;
                let from_handle = self.accounts.handle(from_number)?;
                let to_handle = self.accounts.handle(to_number)?;

                // Fixed global lock order: ascending account number
                let (mut from_account, mut to_account) = if from_number < to_number {
                    let from_guard = lock_account(&from_handle);
                    let to_guard = lock_account(&to_handle);
                    (from_guard, to_guard)
                } else {
                    let to_guard = lock_account(&to_handle);
                    let from_guard = lock_account(&from_handle);
                    (from_guard, to_guard)
                };

                // Probe the credit side before any mutation so a failing
                // deposit can never follow a successful debit
                to_account
                    .balance
                    .checked_add(amount)
                    .ok_or_else(|| LedgerError::overflow("transfer", to_number))?;

                from_account.withdraw(amount, now)?;
                to_account.deposit(amount, now)?;
                transaction.complete()?;
                self.transactions.put(transaction.clone());
            }
            other => {
                return Err(LedgerError::invalid_operation(format!(
                    "no balance effects defined for {:?} movements",
                    other
                )));
            }
        }
        Ok(())
    }

    // ----- administrative and query operations -----

    /// Administratively mark a completed transaction reversed
    ///
    /// The compensating money movement belongs to an external workflow;
    /// this transition only records the reversal on the original record.
    pub fn reverse_transaction(&self, transaction_id: &str) -> Result<Transaction, LedgerError> {
        let mut transaction = self.transactions.get(transaction_id)?;
        transaction.reverse()?;
        self.transactions.put(transaction.clone());
        info!(transaction = %transaction_id, "transaction reversed");
        Ok(transaction)
    }

    /// Look up a transaction by id
    pub fn transaction(&self, transaction_id: &str) -> Result<Transaction, LedgerError> {
        self.transactions.get(transaction_id)
    }

    /// All transactions touching an account, newest first
    pub fn transactions_for_account(&self, account_number: &str) -> Vec<Transaction> {
        self.transactions.for_account(account_number)
    }

    /// True iff the transaction is a transfer between two accounts of the
    /// same customer
    ///
    /// Derived from the account records at query time; not stored.
    pub fn is_internal_transfer(&self, transaction: &Transaction) -> Result<bool, LedgerError> {
        if !transaction.is_transfer() {
            return Ok(false);
        }
        let from_number = required_account(transaction.from_account.as_deref())?;
        let to_number = required_account(transaction.to_account.as_deref())?;
        let from = self.accounts.snapshot(from_number)?;
        let to = self.accounts.snapshot(to_number)?;
        Ok(from.customer_id == to.customer_id)
    }
}

impl Default for TransactionEngine {
    fn default() -> Self {
        Self::new(Arc::new(crate::core::clock::SystemClock))
    }
}

fn required_account(number: Option<&str>) -> Result<&str, LedgerError> {
    number.ok_or_else(|| LedgerError::invalid_operation("movement is missing a required account"))
}
