// Ledger Sink - Durable persistence for the transaction ledger
//
// The ledger is written as one record holding the whole ordered sequence.
// Every save replaces that record; there is no append log. Two sinks exist:
// - SledSink: crash-safe embedded storage, one database per node
// - MemorySink: in-process sink with switchable write failures

use crate::ledger::Transaction;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Key layout inside the sled database
mod keys {
    pub const TRANSACTIONS: &[u8] = b"ledger:transactions";
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),

    #[error("Sink rejected write: {0}")]
    WriteRejected(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Statistics about the storage
#[derive(Clone, Debug)]
pub struct StorageStats {
    /// Number of keys in the database
    pub key_count: usize,
    /// Approximate disk size in bytes
    pub disk_size_bytes: u64,
}

/// Encode a full ledger for storage
pub fn encode_transactions(transactions: &[Transaction]) -> Result<Vec<u8>, StoreError> {
    postcard::to_allocvec(transactions).map_err(|e| StoreError::SerializationFailed(e.to_string()))
}

/// Decode a full ledger from storage
pub fn decode_transactions(bytes: &[u8]) -> Result<Vec<Transaction>, StoreError> {
    postcard::from_bytes(bytes).map_err(|e| StoreError::DeserializationFailed(e.to_string()))
}

/// A durable home for the ledger
///
/// `load` returns `Ok(None)` when nothing was ever saved and an error when
/// the stored record cannot be decoded. `save` overwrites the previous
/// record with the full sequence.
pub trait LedgerSink: Send + Sync {
    /// Read the stored ledger, if any
    fn load(&self) -> Result<Option<Vec<Transaction>>, StoreError>;

    /// Replace the stored ledger with `transactions`
    fn save(&self, transactions: &[Transaction]) -> Result<(), StoreError>;
}

// ============================================================================
// SLED SINK
// ============================================================================

/// Sled-backed ledger sink
///
/// Writes are flushed before `save` returns, so a saved ledger survives a
/// process crash.
pub struct SledSink {
    db: sled::Db,
}

impl SledSink {
    /// Open or create a sink at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    /// Check if nothing has been stored yet
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }

    /// Get storage statistics
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            key_count: self.db.len(),
            disk_size_bytes: self.db.size_on_disk().unwrap_or(0),
        }
    }

    /// Put raw bytes under the ledger key
    pub fn put_raw(&self, value: &[u8]) -> Result<(), StoreError> {
        self.db.insert(keys::TRANSACTIONS, value)?;
        self.flush()
    }

    /// Get the raw ledger record
    pub fn get_raw(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(keys::TRANSACTIONS)?.map(|v| v.to_vec()))
    }
}

impl LedgerSink for SledSink {
    fn load(&self) -> Result<Option<Vec<Transaction>>, StoreError> {
        match self.get_raw()? {
            Some(bytes) => decode_transactions(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, transactions: &[Transaction]) -> Result<(), StoreError> {
        let bytes = encode_transactions(transactions)?;
        self.put_raw(&bytes)
    }
}

// ============================================================================
// MEMORY SINK
// ============================================================================

/// In-memory ledger sink
///
/// Holds the encoded record exactly as `SledSink` would. Writes can be made
/// to fail with `set_fail_writes`, which lets callers exercise the
/// persistence error path.
#[derive(Default)]
pub struct MemorySink {
    record: Mutex<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
    saves: Mutex<u64>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink holding a raw record
    pub fn with_record(bytes: Vec<u8>) -> Self {
        Self {
            record: Mutex::new(Some(bytes)),
            ..Self::default()
        }
    }

    /// Make every subsequent save fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The currently stored raw record
    pub fn raw(&self) -> Option<Vec<u8>> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> u64 {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LedgerSink for MemorySink {
    fn load(&self) -> Result<Option<Vec<Transaction>>, StoreError> {
        match self.raw() {
            Some(bytes) => decode_transactions(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, transactions: &[Transaction]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected("memory sink is read-only".to_string()));
        }
        let bytes = encode_transactions(transactions)?;
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(bytes);
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
