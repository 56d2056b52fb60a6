// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol unit tests

use super::*;
use serde_json::json;
use sluice_engine::Status;

#[test]
fn requests_are_tagged_by_type() {
    let request = Request::Purchase {
        item: ItemId::from("A"),
    };

    let encoded = encode(&request).expect("encode failed");
    let value: Value = serde_json::from_slice(&encoded).unwrap();

    assert_eq!(value, json!({"type": "Purchase", "item": "A"}));
    assert_eq!(decode::<Request>(&encoded).unwrap(), request);
}

#[test]
fn ingest_carries_an_arbitrary_payload() {
    let payload = json!({"user_id": 7, "timestamp": "2026-01-12T13:01:00Z", "tags": [1, 2]});
    let request = Request::Ingest {
        payload: payload.clone(),
    };

    let decoded: Request = decode(&encode(&request).unwrap()).unwrap();

    assert_eq!(decoded, Request::Ingest { payload });
}

#[test]
fn reply_response_flattens_the_reply() {
    let response = Response::Reply(Reply {
        status: Status::Ok,
        message: "Purchase successful".to_string(),
        allocation_id: Some(sluice_core::AllocationId(12)),
    });

    let encoded = encode(&response).unwrap();
    let value: Value = serde_json::from_slice(&encoded).unwrap();

    assert_eq!(
        value,
        json!({
            "type": "Reply",
            "status": "ok",
            "message": "Purchase successful",
            "allocation_id": 12,
        })
    );
    assert_eq!(decode::<Response>(&encoded).unwrap(), response);
}

#[test]
fn status_response_survives_the_wire() {
    let response = Response::Status {
        uptime_secs: 3600,
        pending_events: 12,
        outage: true,
        stock: vec![StockLevel {
            item: ItemId::from("A"),
            remaining: Some(40),
            allocations: 60,
        }],
    };

    let decoded: Response = decode(&encode(&response).unwrap()).unwrap();
    assert_eq!(decoded, response);
}

#[test]
fn encode_returns_json_without_length_prefix() {
    let encoded = encode(&Response::Ok).expect("encode failed");

    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(json_str.starts_with('{'), "should be JSON object: {}", json_str);
}

#[tokio::test]
async fn write_message_adds_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);

    let mut cursor = std::io::Cursor::new(buffer);
    assert_eq!(read_message(&mut cursor).await.unwrap(), data);
}

#[tokio::test]
async fn empty_stream_is_a_closed_connection() {
    let mut cursor = std::io::Cursor::new(Vec::new());
    assert!(matches!(
        read_message(&mut cursor).await,
        Err(ProtocolError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn truncated_body_is_a_closed_connection() {
    let mut bytes = 10u32.to_be_bytes().to_vec();
    bytes.extend_from_slice(b"abc");
    let mut cursor = std::io::Cursor::new(bytes);

    assert!(matches!(
        read_message(&mut cursor).await,
        Err(ProtocolError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn oversized_prefix_is_rejected_before_reading() {
    let bytes = ((MAX_MESSAGE_SIZE + 1) as u32).to_be_bytes().to_vec();
    let mut cursor = std::io::Cursor::new(bytes);

    assert!(matches!(
        read_message(&mut cursor).await,
        Err(ProtocolError::MessageTooLarge { .. })
    ));
}

#[tokio::test]
async fn read_request_times_out_on_a_silent_peer() {
    let (mut client, _server) = tokio::io::duplex(64);

    let result = read_request(&mut client, Duration::from_millis(20)).await;

    assert!(matches!(result, Err(ProtocolError::Timeout)));
}

#[tokio::test]
async fn request_and_response_over_a_duplex_pipe() {
    let (mut client, mut server) = tokio::io::duplex(1024);

    let body = encode(&Request::Status).unwrap();
    write_message(&mut client, &body).await.unwrap();
    let request = read_request(&mut server, DEFAULT_TIMEOUT).await.unwrap();
    assert_eq!(request, Request::Status);

    write_response(&mut server, &Response::Pong, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    let reply: Response = decode(&read_message(&mut client).await.unwrap()).unwrap();
    assert_eq!(reply, Response::Pong);
}
