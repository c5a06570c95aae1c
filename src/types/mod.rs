//! Core data types for the banking ledger
//!
//! This module defines the domain records (accounts, transactions, loans,
//! loan payments), the principal references consumed from the identity
//! layer, the money arithmetic helpers, and the error type used throughout
//! the crate.

pub mod account;
pub mod error;
pub mod loan;
pub mod money;
pub mod principal;
pub mod transaction;

pub use account::{Account, AccountStatus, AccountTerms, AccountType};
pub use error::LedgerError;
pub use loan::{
    Loan, LoanApplication, LoanPayment, LoanStatus, LoanType, PaymentStatus, PaymentType,
};
pub use principal::{Principal, PrincipalStatus, Role};
pub use transaction::{MovementRequest, Transaction, TransactionStatus, TransactionType};
