// Protocol - Message types for ledger communication
//
// Every message is a JSON object with a `type` discriminator and an optional
// `data` field:
// - transaction:   push of one newly seen transaction
// - sync_request:  ask the peer for its whole ledger (no data)
// - sync_response: the peer's whole ledger, in its order
//
// Types this node does not know are decoded as `Message::Unknown` so the
// connection can ignore them and keep going.

use crate::ledger::Transaction;
use serde_json::{json, Map, Value};
use thiserror::Error;

const TYPE_FIELD: &str = "type";
const DATA_FIELD: &str = "data";

/// Wire tag of a transaction push
pub const TYPE_TRANSACTION: &str = "transaction";
/// Wire tag of a sync request
pub const TYPE_SYNC_REQUEST: &str = "sync_request";
/// Wire tag of a sync response
pub const TYPE_SYNC_RESPONSE: &str = "sync_response";

/// Types of messages in the protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    Transaction,
    SyncRequest,
    SyncResponse,
    Unknown,
}

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Message is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Invalid `{kind}` payload: {reason}")]
    InvalidPayload { kind: String, reason: String },

    #[error("Failed to encode message: {0}")]
    EncodeFailed(String),
}

/// A protocol message
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Transaction(Transaction),
    SyncRequest,
    SyncResponse(Vec<Transaction>),
    /// A well-formed message with a type this node does not handle
    Unknown { kind: String },
}

impl Message {
    /// Get the message type
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Transaction(_) => MessageType::Transaction,
            Message::SyncRequest => MessageType::SyncRequest,
            Message::SyncResponse(_) => MessageType::SyncResponse,
            Message::Unknown { .. } => MessageType::Unknown,
        }
    }

    /// The `type` tag this message carries on the wire
    pub fn type_tag(&self) -> &str {
        match self {
            Message::Transaction(_) => TYPE_TRANSACTION,
            Message::SyncRequest => TYPE_SYNC_REQUEST,
            Message::SyncResponse(_) => TYPE_SYNC_RESPONSE,
            Message::Unknown { kind } => kind.as_str(),
        }
    }

    /// Serialize to JSON bytes
    pub fn to_json(&self) -> Result<Vec<u8>, ProtocolError> {
        let value = match self {
            Message::Transaction(tx) => json!({ "type": TYPE_TRANSACTION, "data": tx }),
            Message::SyncRequest => json!({ "type": TYPE_SYNC_REQUEST }),
            Message::SyncResponse(txs) => json!({ "type": TYPE_SYNC_RESPONSE, "data": txs }),
            Message::Unknown { kind } => json!({ "type": kind }),
        };
        serde_json::to_vec(&value).map_err(|e| ProtocolError::EncodeFailed(e.to_string()))
    }

    /// Deserialize from JSON bytes
    pub fn from_json(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Err(ProtocolError::Malformed(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let kind = match object.remove(TYPE_FIELD) {
            Some(Value::String(kind)) => kind,
            Some(_) => {
                return Err(ProtocolError::Malformed("`type` must be a string".to_string()))
            }
            None => return Err(ProtocolError::MissingField(TYPE_FIELD)),
        };

        match kind.as_str() {
            TYPE_TRANSACTION => {
                let data = take_data(&mut object)?;
                decode_payload(&kind, data).map(Message::Transaction)
            }
            TYPE_SYNC_REQUEST => Ok(Message::SyncRequest),
            TYPE_SYNC_RESPONSE => {
                let data = take_data(&mut object)?;
                decode_payload(&kind, data).map(Message::SyncResponse)
            }
            _ => Ok(Message::Unknown { kind }),
        }
    }
}

fn take_data(object: &mut Map<String, Value>) -> Result<Value, ProtocolError> {
    match object.remove(DATA_FIELD) {
        Some(Value::Null) | None => Err(ProtocolError::MissingField(DATA_FIELD)),
        Some(data) => Ok(data),
    }
}

fn decode_payload<T>(kind: &str, data: Value) -> Result<T, ProtocolError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(data).map_err(|e| ProtocolError::InvalidPayload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
