// Node Configuration

use crate::node::NodeError;
use crate::transport::TcpTransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Prefix of the per-port ledger location inside the data directory
pub const LEDGER_FILE_PREFIX: &str = "transactions_";

/// Configuration for a ledger node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Listening socket and connection behavior
    pub transport: TcpTransportConfig,
    /// Directory holding the ledger
    pub data_dir: PathBuf,
    /// Fixed wallet address (a random one is generated when unset)
    pub wallet_address: Option<String>,
    /// How long shutdown waits for connection tasks to finish
    pub shutdown_grace_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            transport: TcpTransportConfig::default(),
            data_dir: PathBuf::from("."),
            wallet_address: None,
            shutdown_grace_secs: 5,
        }
    }
}

impl NodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transport(mut self, transport: TcpTransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.transport.bind_address = host.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.transport.bind_port = port;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_wallet_address(mut self, address: &str) -> Self {
        self.wallet_address = Some(address.to_string());
        self
    }

    pub fn with_shutdown_grace(mut self, secs: u64) -> Self {
        self.shutdown_grace_secs = secs;
        self
    }

    /// Where this node's ledger lives; keyed by the listening port
    ///
    /// The key is the configured `bind_port`, not the port the OS hands out.
    /// Every node configured with port 0 therefore resolves to
    /// `transactions_0`, and a second such node opening the same `data_dir`
    /// fails on the ledger's lock. Give ephemeral-port nodes their own
    /// `data_dir`.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}{}", LEDGER_FILE_PREFIX, self.transport.bind_port))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), NodeError> {
        self.transport
            .validate()
            .map_err(|e| NodeError::InvalidConfig(e.to_string()))?;
        if let Some(address) = &self.wallet_address {
            if address.is_empty() {
                return Err(NodeError::InvalidConfig("wallet_address cannot be empty".to_string()));
            }
        }
        Ok(())
    }
}
