// Transaction - The unit recorded on the ledger
//
// Transactions carry no id. Two transactions are the same transaction when
// sender, recipient and amount are all equal.

use crate::identity::WalletAddress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable transfer record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    sender: String,
    recipient: String,
    amount: f64,
}

impl Transaction {
    /// Create a transaction from raw identifiers
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: f64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// Create a transaction sent from a wallet
    pub fn from_wallet(sender: &WalletAddress, recipient: impl Into<String>, amount: f64) -> Self {
        Self::new(sender.as_str(), recipient, amount)
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.sender, self.recipient, self.amount)
    }
}
