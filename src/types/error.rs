//! Error types for the banking ledger core
//!
//! Every error in this module is recoverable by the caller: the core never
//! retries internally, and no error leaves an account balance partially
//! mutated. Where a money movement fails, the caller receives both the error
//! and a durable FAILED transaction record.

use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the ledger core
///
/// Each variant carries enough context to diagnose the rejection without
/// consulting logs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// A monetary input was non-positive or otherwise malformed
    #[error("Invalid amount {amount} for {operation}")]
    InvalidAmount {
        /// Operation that rejected the amount
        operation: String,
        /// The offending amount
        amount: Decimal,
    },

    /// An infeasible state transition or business-rule violation
    ///
    /// Examples: withdrawing below the minimum balance, overpaying a loan,
    /// submitting a transfer without both accounts, approving an account
    /// that is not pending approval.
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Human-readable rejection reason
        reason: String,
    },

    /// A referenced account, transaction, or loan does not exist
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Entity kind ("account", "transaction", "loan", ...)
        kind: String,
        /// The identifier that failed to resolve
        id: String,
    },

    /// Natural-key collision on insert
    ///
    /// Identifiers are generated by the core, so this surfaces a store-level
    /// uniqueness violation rather than a caller mistake.
    #[error("Duplicate {kind} identifier '{id}'")]
    DuplicateIdentifier {
        /// Entity kind
        kind: String,
        /// The colliding identifier
        id: String,
    },

    /// Arithmetic overflow in a balance computation
    ///
    /// Only reachable at the limits of `Decimal` range; the mutation is
    /// rejected and the balance left unchanged.
    #[error("Arithmetic overflow in {operation} for '{id}'")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account or loan identifier
        id: String,
    },
}

// Helper constructors, matching call sites that build errors inline

impl LedgerError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(operation: &str, amount: Decimal) -> Self {
        LedgerError::InvalidAmount {
            operation: operation.to_string(),
            amount,
        }
    }

    /// Create an InvalidOperation error
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        LedgerError::InvalidOperation {
            reason: reason.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(kind: &str, id: &str) -> Self {
        LedgerError::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Create a DuplicateIdentifier error
    pub fn duplicate(kind: &str, id: &str) -> Self {
        LedgerError::DuplicateIdentifier {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn overflow(operation: &str, id: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            id: id.to_string(),
        }
    }
}
