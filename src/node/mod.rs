// Node module - THE CONTROLLER
// Owns the ledger, peer set and listening socket of one running node

mod config;
mod controller;
mod error;
mod shutdown;

pub use config::{NodeConfig, LEDGER_FILE_PREFIX};
pub use controller::Node;
pub use error::NodeError;
pub use shutdown::{Shutdown, ShutdownController};
