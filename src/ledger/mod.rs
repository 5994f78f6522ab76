// Ledger module - THE SHARED HISTORY
// Handles the ordered transaction set, duplicate suppression and persistence

mod store;
mod transaction;

pub use store::{InsertOutcome, LedgerError, LedgerStore, SyncReport};
pub use transaction::Transaction;
