// Peer Management - Track live peer connections
//
// A peer is nothing more than an open connection: a handle onto that
// connection's outbound frame queue. When the queue is gone the peer is gone.
// Iteration always works on a copy of the registry, so peers may be added or
// removed by other tasks while a broadcast is in flight.

use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Peer-related errors
#[derive(Error, Debug)]
pub enum PeerError {
    #[error("Connection {0} is closed")]
    ConnectionClosed(ConnectionId),
}

// ============================================================================
// CONNECTION ID
// ============================================================================

/// Unique identifier for a connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId([u8; 16]);

impl ConnectionId {
    /// Generate a new unique connection ID
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill(&mut bytes);
        Self(bytes)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

// ============================================================================
// PEER HANDLE
// ============================================================================

/// Sending side of one live connection
///
/// Frames pushed here are written to the socket by the connection's writer
/// task. Cloning the handle does not open a new connection.
#[derive(Clone, Debug)]
pub struct PeerHandle {
    id: ConnectionId,
    address: SocketAddr,
    outbound: mpsc::Sender<Vec<u8>>,
}

impl PeerHandle {
    /// Create a handle for a connection's outbound queue
    pub fn new(address: SocketAddr, outbound: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            id: ConnectionId::generate(),
            address,
            outbound,
        }
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the remote address
    pub fn address(&self) -> &SocketAddr {
        &self.address
    }

    /// Whether the writer side of the connection has gone away
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Queue an already-framed message for this peer
    pub async fn send_frame(&self, frame: Vec<u8>) -> Result<(), PeerError> {
        self.outbound
            .send(frame)
            .await
            .map_err(|_| PeerError::ConnectionClosed(self.id))
    }
}

// ============================================================================
// PEER REGISTRY
// ============================================================================

/// Outcome of a broadcast
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers the frame was handed to
    pub delivered: usize,
    /// Peers dropped from the registry because the send failed
    pub dropped: Vec<ConnectionId>,
}

/// Registry of live peer connections
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: Mutex<HashMap<ConnectionId, PeerHandle>>,
}

impl PeerRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, PeerHandle>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Get number of peers
    pub fn peer_count(&self) -> usize {
        self.lock().len()
    }

    /// Check if we have a peer
    pub fn has_peer(&self, id: &ConnectionId) -> bool {
        self.lock().contains_key(id)
    }

    /// Add a peer; returns false if the connection was already registered
    pub fn add(&self, peer: PeerHandle) -> bool {
        let id = peer.id();
        let added = self.lock().insert(id, peer).is_none();
        if added {
            debug!(connection = %id, "peer registered");
        }
        added
    }

    /// Remove a peer; removing an absent peer is a no-op
    pub fn remove(&self, id: &ConnectionId) -> Option<PeerHandle> {
        let removed = self.lock().remove(id);
        if let Some(peer) = &removed {
            debug!(connection = %id, address = %peer.address(), "peer removed");
        }
        removed
    }

    /// Copy of the current peer set
    pub fn snapshot(&self) -> Vec<PeerHandle> {
        self.lock().values().cloned().collect()
    }

    /// Visit every peer present when the call started
    ///
    /// The registry lock is not held while `f` runs, so `f` may add or
    /// remove peers itself.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&PeerHandle),
    {
        for peer in self.snapshot() {
            f(&peer);
        }
    }

    /// Send one frame to every peer
    ///
    /// A failed send removes that peer and the broadcast carries on with
    /// the rest.
    pub async fn broadcast_frame(&self, frame: &[u8]) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for peer in self.snapshot() {
            match peer.send_frame(frame.to_vec()).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(address = %peer.address(), error = %e, "dropping peer after failed send");
                    report.dropped.push(peer.id());
                }
            }
        }

        for id in &report.dropped {
            self.remove(id);
        }

        report
    }
}
