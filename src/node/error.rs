use crate::ledger::LedgerError;
use crate::storage::StoreError;
use crate::sync::SendError;
use crate::transport::TransportError;
use thiserror::Error;

/// Errors surfaced by the node controller
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Connection error: {0}")]
    Connection(#[from] TransportError),

    #[error("Connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Send error: {0}")]
    Send(#[from] SendError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] LedgerError),

    #[error("Amount {0} cannot be sent to peers; it must be a finite number")]
    InvalidAmount(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Node is already listening")]
    AlreadyListening,

    #[error("Node is shut down")]
    ShutDown,
}

impl From<StoreError> for NodeError {
    fn from(err: StoreError) -> Self {
        NodeError::Persistence(LedgerError::Persistence(err))
    }
}

impl NodeError {
    /// Dial, bind or accept failures
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Io(_))
    }

    pub fn is_persistence_error(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}
