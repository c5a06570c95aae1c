//! Append-only transaction record storage
//!
//! Every submitted movement leaves a record here, including failed ones;
//! records are never deleted. "All transactions for an account" is an index
//! query recomputed on demand, not an owned collection on the account.

use crate::types::{LedgerError, Transaction};
use dashmap::DashMap;
use std::cmp::Reverse;

/// Concurrent store of transaction records keyed by transaction id
#[derive(Debug, Default)]
pub struct TransactionStore {
    transactions: DashMap<String, Transaction>,
}

impl TransactionStore {
    /// Create an empty store
    pub fn new() -> Self {
        TransactionStore {
            transactions: DashMap::new(),
        }
    }

    /// Insert a freshly created record
    ///
    /// # Errors
    ///
    /// * `DuplicateIdentifier` if the id is already present; ids are
    ///   generated internally, so this guards against generator misuse
    pub fn insert(&self, transaction: Transaction) -> Result<(), LedgerError> {
        let id = transaction.transaction_id.clone();
        let mut inserted = false;
        self.transactions.entry(id.clone()).or_insert_with(|| {
            inserted = true;
            transaction
        });

        if inserted {
            Ok(())
        } else {
            Err(LedgerError::duplicate("transaction", &id))
        }
    }

    /// Persist a state transition of an existing record
    ///
    /// Only the transaction engine calls this, and only to advance the
    /// record's status; the amount and accounts never change.
    pub fn put(&self, transaction: Transaction) {
        self.transactions
            .insert(transaction.transaction_id.clone(), transaction);
    }

    /// Look up a record by id
    ///
    /// # Errors
    ///
    /// * `NotFound` if no record has this id
    pub fn get(&self, transaction_id: &str) -> Result<Transaction, LedgerError> {
        self.transactions
            .get(transaction_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))
    }

    /// All records touching an account, newest first
    ///
    /// Ties on the timestamp are broken by id, descending, so repeated
    /// queries return an identical ordering.
    pub fn for_account(&self, account_number: &str) -> Vec<Transaction> {
        let mut matches: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| {
                let tx = entry.value();
                tx.from_account.as_deref() == Some(account_number)
                    || tx.to_account.as_deref() == Some(account_number)
            })
            .map(|entry| entry.value().clone())
            .collect();

        matches.sort_by_key(|tx| Reverse((tx.transaction_date, tx.transaction_id.clone())));
        matches
    }

    /// Number of records in the store
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// True iff the store holds no records
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
