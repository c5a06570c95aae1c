//! Banking Ledger Library
//! # Overview
//!
//! This library implements a retail bank's core money-movement and lending
//! ledger: accounts that hold balances, transactions that move money between
//! accounts, and loans that are disbursed, amortized, and repaid.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Transaction, Loan, Money helpers)
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Money movement orchestration and account lifecycle
//!   - [`core::loans`] - Loan origination, amortization, and repayment
//!   - [`core::account_store`] - Concurrent account arena with per-account locks
//!   - [`core::transaction_store`] - Append-only transaction history
//! - [`cli`] - CLI argument parsing
//! - [`io`] - CSV input/output for the replay binary
//! - [`replay`] - The batch replay pipeline behind the binary
//!
//! # Invariants
//!
//! The engine upholds three contracts no matter how many threads submit
//! concurrently:
//!
//! - An account balance is never written negative; a withdrawal that would
//!   breach the configured minimum (or zero) is rejected before mutation.
//! - A transfer mutates both accounts or neither; source feasibility is
//!   checked under both account locks before any credit or debit.
//! - Every submitted movement leaves an append-only transaction record,
//!   including rejected ones (terminal FAILED with the reason).
//!
//! Loans flow independently: amortization is fixed at origination and the
//! outstanding balance only decreases through recorded payments, reaching
//! exactly zero at payoff.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod replay;
pub mod types;

pub use crate::core::{Clock, LoanEngine, ManualClock, SystemClock, TransactionEngine};
pub use crate::io::write_accounts_csv;
pub use crate::types::{
    Account, AccountStatus, AccountTerms, AccountType, LedgerError, Loan, LoanApplication,
    LoanPayment, LoanStatus, LoanType, MovementRequest, PaymentStatus, PaymentType, Principal,
    Transaction, TransactionStatus, TransactionType,
};
