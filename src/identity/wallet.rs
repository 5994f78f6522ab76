// Wallet Address - The node's identity on the ledger
//
// A random `0x`-prefixed hex identifier, generated once per process and used
// as the sender of every locally created transaction. It is not bound to any
// key; peers treat it as an opaque string.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

const ADDRESS_PREFIX: &str = "0x";

/// Number of random bytes behind an address (40 hex characters)
pub const ADDRESS_BYTES: usize = 20;

/// Opaque wallet identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Generate a fresh random address
    pub fn generate() -> Self {
        let mut bytes = [0u8; ADDRESS_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(format!("{}{}", ADDRESS_PREFIX, hex::encode(bytes)))
    }

    /// Wrap an existing identifier without checking its shape
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Get the address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this looks like a generated address (`0x` + 40 hex chars)
    pub fn is_generated_form(&self) -> bool {
        self.0
            .strip_prefix(ADDRESS_PREFIX)
            .map(|rest| {
                rest.len() == ADDRESS_BYTES * 2 && rest.chars().all(|c| c.is_ascii_hexdigit())
            })
            .unwrap_or(false)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<WalletAddress> for String {
    fn from(address: WalletAddress) -> Self {
        address.0
    }
}
