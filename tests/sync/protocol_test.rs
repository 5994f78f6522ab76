// Protocol Tests
// Tests for the JSON message envelope

use ledgermesh::ledger::Transaction;
use ledgermesh::sync::{
    Message, MessageType, ProtocolError, TYPE_SYNC_REQUEST, TYPE_SYNC_RESPONSE, TYPE_TRANSACTION,
};
use serde_json::{json, Value};

fn to_value(message: &Message) -> Value {
    serde_json::from_slice(&message.to_json().unwrap()).unwrap()
}

// ============================================================================
// ENCODING
// ============================================================================

#[test]
fn test_transaction_envelope() {
    let message = Message::Transaction(Transaction::new("0xa", "0xb", 12.5));

    assert_eq!(
        to_value(&message),
        json!({
            "type": "transaction",
            "data": { "sender": "0xa", "recipient": "0xb", "amount": 12.5 }
        })
    );
}

#[test]
fn test_sync_response_envelope() {
    let message = Message::SyncResponse(vec![
        Transaction::new("0xa", "0xb", 1.0),
        Transaction::new("0xb", "0xc", 2.0),
    ]);
    let value = to_value(&message);

    assert_eq!(value["type"], TYPE_SYNC_RESPONSE);
    assert_eq!(value["data"].as_array().unwrap().len(), 2);
    assert_eq!(value["data"][1]["recipient"], "0xc");
}

#[test]
fn test_empty_sync_response_carries_empty_list() {
    let value = to_value(&Message::SyncResponse(Vec::new()));

    assert_eq!(value["data"], json!([]));
}

#[test]
fn test_type_tags() {
    assert_eq!(Message::SyncRequest.type_tag(), TYPE_SYNC_REQUEST);
    assert_eq!(
        Message::Transaction(Transaction::new("0xa", "0xb", 1.0)).type_tag(),
        TYPE_TRANSACTION
    );
}

// ============================================================================
// DECODING
// ============================================================================

#[test]
fn test_decode_transaction() {
    let bytes = br#"{"type":"transaction","data":{"sender":"0xa","recipient":"0xb","amount":3}}"#;

    let message = Message::from_json(bytes).unwrap();

    assert_eq!(message, Message::Transaction(Transaction::new("0xa", "0xb", 3.0)));
}

#[test]
fn test_decode_sync_request_ignores_data() {
    let message = Message::from_json(br#"{"type":"sync_request","data":null}"#).unwrap();

    assert_eq!(message, Message::SyncRequest);
}

#[test]
fn test_decode_roundtrip_preserves_order() {
    let transactions: Vec<_> = (0..5)
        .map(|i| Transaction::new("0xa", "0xb", i as f64))
        .collect();
    let message = Message::SyncResponse(transactions.clone());

    let decoded = Message::from_json(&message.to_json().unwrap()).unwrap();

    assert_eq!(decoded, Message::SyncResponse(transactions));
}

#[test]
fn test_decode_unknown_type() {
    let message = Message::from_json(br#"{"type":"ping"}"#).unwrap();

    assert_eq!(message, Message::Unknown { kind: "ping".to_string() });
    assert_eq!(message.message_type(), MessageType::Unknown);
}

#[test]
fn test_decode_not_json() {
    let result = Message::from_json(b"definitely not json");

    assert!(matches!(result, Err(ProtocolError::Malformed(_))));
}

#[test]
fn test_decode_not_an_object() {
    let result = Message::from_json(br#"["transaction"]"#);

    assert!(matches!(result, Err(ProtocolError::Malformed(_))));
}

#[test]
fn test_decode_missing_type() {
    let result = Message::from_json(br#"{"data":[]}"#);

    assert!(matches!(result, Err(ProtocolError::MissingField("type"))));
}

#[test]
fn test_decode_non_string_type() {
    let result = Message::from_json(br#"{"type":7}"#);

    assert!(matches!(result, Err(ProtocolError::Malformed(_))));
}

#[test]
fn test_decode_transaction_without_data() {
    let result = Message::from_json(br#"{"type":"transaction"}"#);

    assert!(matches!(result, Err(ProtocolError::MissingField("data"))));
}

#[test]
fn test_decode_transaction_missing_amount() {
    let result = Message::from_json(br#"{"type":"transaction","data":{"sender":"0xa","recipient":"0xb"}}"#);

    assert!(matches!(
        result,
        Err(ProtocolError::InvalidPayload { ref kind, .. }) if kind == "transaction"
    ));
}

#[test]
fn test_decode_sync_response_with_object_payload() {
    let result = Message::from_json(br#"{"type":"sync_response","data":{"sender":"0xa"}}"#);

    assert!(matches!(result, Err(ProtocolError::InvalidPayload { .. })));
}
