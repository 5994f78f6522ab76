// Identity module - The node's wallet address

mod wallet;

pub use wallet::{WalletAddress, ADDRESS_BYTES};
