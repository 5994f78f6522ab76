// Connection Handler - Per-connection read loop
//
// Open -> Reading -> Dispatch -> Reading ... -> Closed
//
// The same loop runs for accepted and dialed connections. EOF, a bad frame,
// an undecodable message or an I/O error closes this connection only; the
// node keeps running. Unknown message types are logged and skipped.

use crate::ledger::LedgerStore;
use crate::node::Shutdown;
use crate::sync::catchup::{apply_sync_response, serve_sync_request, SendError};
use crate::sync::{Message, PeerHandle, PeerRegistry, ProtocolError};
use crate::transport::{FrameError, FrameReader, TcpTransportConfig};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Why a connection's read loop ended
#[derive(Error, Debug)]
pub enum CloseReason {
    #[error("peer closed the connection")]
    PeerClosed,

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("no data within {0:?}")]
    ReadTimeout(Duration),

    #[error("outbound side of the connection is gone")]
    WriterClosed,

    #[error("node is shutting down")]
    Shutdown,
}

impl CloseReason {
    /// Whether the connection ended the normal way
    pub fn is_graceful(&self) -> bool {
        matches!(self, Self::PeerClosed | Self::Shutdown)
    }
}

/// Split a TCP stream into a peer handle and a frame reader
///
/// A writer task drains the handle's queue into the socket. It stops when the
/// socket fails or every clone of the handle is dropped, and then closes the
/// write side.
pub fn open_connection(
    stream: TcpStream,
    config: &TcpTransportConfig,
) -> std::io::Result<(PeerHandle, FrameReader<OwnedReadHalf>)> {
    let address = stream.peer_addr()?;
    let (reader, mut writer) = stream.into_split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Vec<u8>>(config.outbound_queue);

    tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if let Err(e) = writer.write_all(&frame).await {
                warn!(%address, error = %e, "write failed, closing outbound side");
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    Ok((
        PeerHandle::new(address, outbound_tx),
        FrameReader::new(reader, config.max_frame_bytes),
    ))
}

/// Read loop for one connection
pub struct ConnectionHandler<R> {
    peer: PeerHandle,
    reader: FrameReader<R>,
    ledger: Arc<LedgerStore>,
    peers: Arc<PeerRegistry>,
    read_timeout: Option<Duration>,
    max_frame_bytes: usize,
}

impl<R> ConnectionHandler<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(
        peer: PeerHandle,
        reader: FrameReader<R>,
        ledger: Arc<LedgerStore>,
        peers: Arc<PeerRegistry>,
        config: &TcpTransportConfig,
    ) -> Self {
        Self {
            peer,
            reader,
            ledger,
            peers,
            read_timeout: config.read_timeout(),
            max_frame_bytes: config.max_frame_bytes,
        }
    }

    /// Run until the connection closes or shutdown is signalled
    pub async fn run(mut self, mut shutdown: Shutdown) -> CloseReason {
        let address = *self.peer.address();
        debug!(%address, connection = %self.peer.id(), "connection open");

        let reason = loop {
            let frame = tokio::select! {
                _ = shutdown.recv() => break CloseReason::Shutdown,
                frame = self.next_frame() => frame,
            };

            let payload = match frame {
                Ok(Some(payload)) => payload,
                Ok(None) => break CloseReason::PeerClosed,
                Err(reason) => break reason,
            };

            let message = match Message::from_json(&payload) {
                Ok(message) => message,
                Err(e) => break CloseReason::Protocol(e),
            };

            if let Err(reason) = self.dispatch(message).await {
                break reason;
            }
        };

        self.peers.remove(&self.peer.id());

        if reason.is_graceful() {
            info!(%address, %reason, "connection closed");
        } else {
            warn!(%address, %reason, "connection closed");
        }
        reason
    }

    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, CloseReason> {
        match self.read_timeout {
            Some(limit) => match timeout(limit, self.reader.read_frame()).await {
                Ok(frame) => Ok(frame?),
                Err(_) => Err(CloseReason::ReadTimeout(limit)),
            },
            None => Ok(self.reader.read_frame().await?),
        }
    }

    async fn dispatch(&self, message: Message) -> Result<(), CloseReason> {
        let address = self.peer.address();

        match message {
            Message::Transaction(transaction) => {
                debug!(%address, %transaction, "received transaction");
                if let Err(e) = self.ledger.insert(transaction) {
                    error!(%address, error = %e, "could not store received transaction");
                }
            }

            Message::SyncRequest => {
                match serve_sync_request(&self.ledger, &self.peer, self.max_frame_bytes).await {
                    Ok(_) => {}
                    Err(SendError::Peer(_)) => return Err(CloseReason::WriterClosed),
                    Err(e) => error!(%address, error = %e, "could not answer sync request"),
                }
            }

            Message::SyncResponse(transactions) => {
                if let Err(e) = apply_sync_response(&self.ledger, transactions) {
                    error!(%address, error = %e, "could not store synchronized transactions");
                }
            }

            Message::Unknown { kind } => {
                warn!(%address, kind = %kind, "ignoring message of unknown type");
            }
        }

        Ok(())
    }
}
