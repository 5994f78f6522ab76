// Storage module - PERSISTENCE
// Handles durable storage of the ledger using sled

mod store;

pub use store::{
    decode_transactions, encode_transactions, LedgerSink, MemorySink, SledSink, StorageStats,
    StoreError,
};
