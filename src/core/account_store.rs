//! Concurrent account storage
//!
//! Accounts live in an arena keyed by account number; relationships to
//! customers and transactions are expressed as id references, never as owned
//! collections. Each account is wrapped in its own mutex: that mutex is the
//! exclusive per-account mutation lock the engine holds for the whole
//! check-then-mutate span of a withdrawal or transfer, which is what makes
//! double-spends impossible under concurrent submission.
//!
//! # Thread Safety
//!
//! The `DashMap` provides fine-grained locking for arena operations (insert,
//! lookup), while the per-account `Mutex` serializes balance mutation. Shard
//! guards are never held across a mutation: `handle` clones the `Arc` out of
//! the map, so callers lock accounts without blocking unrelated arena
//! access.

use crate::types::{Account, LedgerError};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Lock an account handle, recovering from poisoning
///
/// Balances are only written after every check has passed, so a panic
/// between check and write cannot leave a half-applied mutation; the inner
/// value of a poisoned mutex is still consistent.
pub(crate) fn lock_account(handle: &Mutex<Account>) -> MutexGuard<'_, Account> {
    handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Concurrent arena of accounts keyed by account number
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: DashMap<String, Arc<Mutex<Account>>>,
}

impl AccountStore {
    /// Create an empty store
    pub fn new() -> Self {
        AccountStore {
            accounts: DashMap::new(),
        }
    }

    /// Insert a newly created account
    ///
    /// # Errors
    ///
    /// * `DuplicateIdentifier` if the account number is already present
    pub fn insert(&self, account: Account) -> Result<(), LedgerError> {
        let number = account.account_number.clone();
        let mut inserted = false;
        self.accounts.entry(number.clone()).or_insert_with(|| {
            inserted = true;
            Arc::new(Mutex::new(account))
        });

        if inserted {
            Ok(())
        } else {
            Err(LedgerError::duplicate("account", &number))
        }
    }

    /// Get the mutation handle for an account
    ///
    /// The returned `Arc` is cloned out of the map, so the caller can lock
    /// it without holding any arena-level guard.
    ///
    /// # Errors
    ///
    /// * `NotFound` if no account has this number
    pub fn handle(&self, account_number: &str) -> Result<Arc<Mutex<Account>>, LedgerError> {
        self.accounts
            .get(account_number)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::not_found("account", account_number))
    }

    /// Read a point-in-time copy of an account
    ///
    /// # Errors
    ///
    /// * `NotFound` if no account has this number
    pub fn snapshot(&self, account_number: &str) -> Result<Account, LedgerError> {
        let handle = self.handle(account_number)?;
        let account = lock_account(&handle);
        Ok(account.clone())
    }

    /// Point-in-time copies of all accounts, sorted by account number
    pub fn snapshots(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| lock_account(entry.value()).clone())
            .collect();
        accounts.sort_by(|a, b| a.account_number.cmp(&b.account_number));
        accounts
    }

    /// Number of accounts in the store
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True iff the store holds no accounts
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
