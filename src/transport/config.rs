// Transport Core Types
// Configuration and errors shared by the TCP transport and the framing layer

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Largest frame accepted or produced by default (16 MiB)
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// TCP TRANSPORT CONFIG
// ============================================================================

/// Configuration for the TCP transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpTransportConfig {
    /// Address to bind to
    pub bind_address: String,
    /// Port to bind to (0 for random)
    pub bind_port: u16,
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// Dial timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle read timeout in seconds (None blocks until data, EOF or error)
    pub read_timeout_secs: Option<u64>,
    /// Largest frame accepted or sent
    pub max_frame_bytes: usize,
    /// Per-connection outbound queue depth
    pub outbound_queue: usize,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            bind_port: 0,
            nodelay: true,
            connect_timeout_secs: 30,
            read_timeout_secs: None,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            outbound_queue: 100,
        }
    }
}

impl TcpTransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_address(mut self, addr: &str) -> Self {
        self.bind_address = addr.to_string();
        self
    }

    pub fn with_bind_port(mut self, port: u16) -> Self {
        self.bind_port = port;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_read_timeout(mut self, secs: Option<u64>) -> Self {
        self.read_timeout_secs = secs;
        self
    }

    pub fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }

    pub fn with_outbound_queue(mut self, depth: usize) -> Self {
        self.outbound_queue = depth;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.max_frame_bytes == 0 {
            return Err(TransportError::InvalidConfig("max_frame_bytes cannot be 0".to_string()));
        }
        if self.max_frame_bytes > u32::MAX as usize {
            return Err(TransportError::InvalidConfig(
                "max_frame_bytes must fit in a u32 length prefix".to_string(),
            ));
        }
        if self.outbound_queue == 0 {
            return Err(TransportError::InvalidConfig("outbound_queue cannot be 0".to_string()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(TransportError::InvalidConfig("connect_timeout_secs cannot be 0".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// TRANSPORT ERRORS
// ============================================================================

/// Errors that can occur in the transport layer
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Bind to {address} failed: {reason}")]
    BindFailed { address: String, reason: String },

    #[error("Connection to {address} failed: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Connection to {0} timed out")]
    Timeout(String),

    #[error("Accept failed: {0}")]
    AcceptFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
