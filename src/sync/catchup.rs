// Catch-up - One-shot full ledger sync for a newly connected peer
//
// The dialing side sends `sync_request` once, before its read loop starts.
// The other side answers with a single `sync_response` holding its whole
// ledger, and the dialer merges it. Duplicate suppression in the ledger makes
// the merge idempotent. There is no re-sync and no delta exchange.

use crate::ledger::{LedgerError, LedgerStore, SyncReport, Transaction};
use crate::sync::{Message, PeerError, PeerHandle, ProtocolError};
use crate::transport::{encode_frame, FrameError};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while sending a message to a peer
#[derive(Error, Debug)]
pub enum SendError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Peer(#[from] PeerError),
}

/// Encode a message and wrap it in a frame
pub fn frame_message(message: &Message, max_frame_bytes: usize) -> Result<Vec<u8>, SendError> {
    let payload = message.to_json()?;
    Ok(encode_frame(&payload, max_frame_bytes)?)
}

/// Ask a freshly dialed peer for its whole ledger
pub async fn request_sync(peer: &PeerHandle, max_frame_bytes: usize) -> Result<(), SendError> {
    let frame = frame_message(&Message::SyncRequest, max_frame_bytes)?;
    peer.send_frame(frame).await?;
    debug!(address = %peer.address(), "sync requested");
    Ok(())
}

/// Answer a sync request on the connection it arrived on
pub async fn serve_sync_request(
    ledger: &LedgerStore,
    peer: &PeerHandle,
    max_frame_bytes: usize,
) -> Result<usize, SendError> {
    let transactions = ledger.snapshot();
    let count = transactions.len();

    let frame = frame_message(&Message::SyncResponse(transactions), max_frame_bytes)?;
    peer.send_frame(frame).await?;
    info!(address = %peer.address(), count, "served sync request");
    Ok(count)
}

/// Merge a received ledger into ours
pub fn apply_sync_response(
    ledger: &LedgerStore,
    transactions: Vec<Transaction>,
) -> Result<SyncReport, LedgerError> {
    let report = ledger.merge(transactions)?;
    info!(
        received = report.received,
        inserted = report.inserted,
        "synchronized transactions"
    );
    Ok(report)
}
