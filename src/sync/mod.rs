// Sync module - HOW NODES TALK
// Handles the wire messages, live peer set, per-connection loop and catch-up sync

mod catchup;
mod handler;
mod peer;
mod protocol;

pub use catchup::{apply_sync_response, frame_message, request_sync, serve_sync_request, SendError};
pub use handler::{open_connection, CloseReason, ConnectionHandler};
pub use peer::{BroadcastReport, ConnectionId, PeerError, PeerHandle, PeerRegistry};
pub use protocol::{
    Message, MessageType, ProtocolError, TYPE_SYNC_REQUEST, TYPE_SYNC_RESPONSE, TYPE_TRANSACTION,
};
