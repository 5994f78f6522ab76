// Ledger Store - The node's ordered, duplicate-free transaction history
//
// All mutations go through one lock so read-check-persist-append is atomic
// with respect to every connection task. The sink is written before memory
// is touched: a failed save leaves both sides on the previous ledger.

use crate::ledger::Transaction;
use crate::storage::{LedgerSink, StoreError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors that can occur during ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

/// Result of an insertion attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The transaction was new and is now persisted
    Inserted,
    /// A structurally-equal transaction was already present
    Duplicate,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// Result of merging a batch of transactions (e.g. a sync response)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Transactions carried by the batch
    pub received: usize,
    /// Transactions that were new to this ledger
    pub inserted: usize,
}

/// Thread-safe ledger backed by a durable sink
pub struct LedgerStore {
    transactions: Mutex<Vec<Transaction>>,
    sink: Arc<dyn LedgerSink>,
}

impl LedgerStore {
    /// Read whatever the sink holds
    ///
    /// A sink with no record yields an empty ledger; a record that cannot be
    /// decoded is an error.
    pub fn load_from_disk(sink: &dyn LedgerSink) -> Result<Vec<Transaction>, LedgerError> {
        Ok(sink.load()?.unwrap_or_default())
    }

    /// Open the ledger, loading its previous contents from the sink
    pub fn open(sink: Arc<dyn LedgerSink>) -> Result<Self, LedgerError> {
        let transactions = Self::load_from_disk(sink.as_ref())?;
        info!(count = transactions.len(), "loaded transactions from sink");

        Ok(Self {
            transactions: Mutex::new(transactions),
            sink,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Transaction>> {
        self.transactions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a transaction unless a structurally-equal one exists
    pub fn insert(&self, transaction: Transaction) -> Result<InsertOutcome, LedgerError> {
        let mut transactions = self.lock();

        if transactions.contains(&transaction) {
            debug!(%transaction, "duplicate transaction skipped");
            return Ok(InsertOutcome::Duplicate);
        }

        let mut candidate = transactions.clone();
        candidate.push(transaction);
        self.persist(&candidate)?;
        *transactions = candidate;

        if let Some(added) = transactions.last() {
            info!(transaction = %added, total = transactions.len(), "transaction added");
        }
        Ok(InsertOutcome::Inserted)
    }

    /// Insert every transaction of a batch, skipping duplicates
    ///
    /// The batch is persisted once. If the save fails nothing from the batch
    /// is kept.
    pub fn merge<I>(&self, batch: I) -> Result<SyncReport, LedgerError>
    where
        I: IntoIterator<Item = Transaction>,
    {
        let mut transactions = self.lock();
        let mut candidate = transactions.clone();
        let mut report = SyncReport::default();

        for transaction in batch {
            report.received += 1;
            if !candidate.contains(&transaction) {
                candidate.push(transaction);
                report.inserted += 1;
            }
        }

        if report.inserted > 0 {
            self.persist(&candidate)?;
            *transactions = candidate;
        }

        debug!(
            received = report.received,
            inserted = report.inserted,
            "merged transaction batch"
        );
        Ok(report)
    }

    fn persist(&self, transactions: &[Transaction]) -> Result<(), LedgerError> {
        self.sink.save(transactions).map_err(|e| {
            error!(error = %e, "failed to persist ledger");
            LedgerError::from(e)
        })
    }

    /// Copy of the current ordered sequence
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.lock().clone()
    }

    /// Check if a structurally-equal transaction is present
    pub fn contains(&self, transaction: &Transaction) -> bool {
        self.lock().contains(transaction)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
