// ledgermesh - Peer-to-peer transaction ledger
//
// Each node keeps an ordered, duplicate-free list of transfers, persists it
// under a file keyed by its listening port, pushes new transactions to the
// peers it dialed, and pulls a peer's whole ledger once when connecting.

pub mod identity;
pub mod ledger;
pub mod node;
pub mod storage;
pub mod sync;
pub mod transport;
