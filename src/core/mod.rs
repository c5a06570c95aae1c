//! Business logic components for the banking ledger
//!
//! - [`engine`] - money movement orchestration and the account lifecycle
//! - [`loans`] - loan origination, amortization, and repayment
//! - [`account_store`] - concurrent account arena with per-account locks
//! - [`transaction_store`] - append-only transaction records
//! - [`clock`] - injected time source
//! - [`ids`] - collision-free identifier generation

pub mod account_store;
pub mod clock;
pub mod engine;
pub mod ids;
pub mod loans;
pub mod transaction_store;

pub use account_store::AccountStore;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::TransactionEngine;
pub use ids::IdGenerator;
pub use loans::LoanEngine;
pub use transaction_store::TransactionStore;
