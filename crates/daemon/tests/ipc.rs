// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tests over the daemon's Unix socket

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use serde_json::json;
use sluice_daemon::protocol::{self, DEFAULT_TIMEOUT};
use sluice_daemon::{serve, startup, Paths, Request, Response};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::UnixStream;

async fn send(socket: &Path, request: Request) -> Response {
    let stream = UnixStream::connect(socket).await.unwrap();
    let (mut reader, mut writer) = stream.into_split();
    let body = protocol::encode(&request).unwrap();
    protocol::write_message(&mut writer, &body).await.unwrap();
    let reply = tokio::time::timeout(DEFAULT_TIMEOUT, protocol::read_message(&mut reader))
        .await
        .unwrap()
        .unwrap();
    protocol::decode(&reply).unwrap()
}

fn setup(config: &str) -> (TempDir, Paths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(&dir.path().join("state"), dir.path());
    std::fs::create_dir_all(&paths.state_dir).unwrap();
    std::fs::write(&paths.config_path, config).unwrap();
    (dir, paths)
}

async fn pending_events(socket: &Path) -> usize {
    match send(socket, Request::Status).await {
        Response::Status { pending_events, .. } => pending_events,
        other => panic!("expected status, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_buyers_over_the_socket() {
    let (_dir, paths) = setup("[store]\nbusy_timeout = \"5s\"\n\n[[stock]]\nitem = \"A\"\nremaining = 10\n");
    let daemon = startup(&paths).await.unwrap();
    let server = tokio::spawn(serve(daemon));

    let buyers: Vec<_> = (0..40)
        .map(|_| {
            let socket = paths.socket_path.clone();
            tokio::spawn(async move {
                send(
                    &socket,
                    Request::Purchase {
                        item: "A".into(),
                    },
                )
                .await
            })
        })
        .collect();

    let mut codes = Vec::new();
    for buyer in buyers {
        match buyer.await.unwrap() {
            Response::Reply(reply) => codes.push(reply.status.code()),
            other => panic!("expected reply, got {:?}", other),
        }
    }
    assert_eq!(codes.iter().filter(|c| **c == 200).count(), 10);
    assert_eq!(codes.iter().filter(|c| **c == 200 || **c == 410 || **c == 500).count(), 40);

    assert_eq!(send(&paths.socket_path, Request::Shutdown).await, Response::ShuttingDown);
    server.await.unwrap().unwrap();
    assert!(!paths.socket_path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn events_survive_an_outage_and_flush_after_restore() {
    let (_dir, paths) = setup("[flush]\nperiod = \"20ms\"\nfailure_pause = \"10ms\"\n");
    let daemon = startup(&paths).await.unwrap();
    let server = tokio::spawn(serve(daemon));
    let socket = paths.socket_path.clone();

    assert_eq!(send(&socket, Request::Outage { enabled: true }).await, Response::Ok);
    for id in 0..5 {
        let response = send(
            &socket,
            Request::Ingest {
                payload: json!({"user_id": id, "timestamp": "2026-01-12T13:01:00Z"}),
            },
        )
        .await;
        assert!(matches!(response, Response::Reply(ref r) if r.status.code() == 202));
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(pending_events(&socket).await, 5);

    assert_eq!(send(&socket, Request::Outage { enabled: false }).await, Response::Ok);
    tokio::time::timeout(Duration::from_secs(5), async {
        while pending_events(&socket).await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    send(&socket, Request::Shutdown).await;
    server.await.unwrap().unwrap();

    let store = sluice_storage::SqliteStore::open(
        paths.state_dir.join("sluice.db"),
        Duration::from_secs(1),
    )
    .unwrap();
    let persisted: Vec<i64> = sluice_storage::DurableStore::events(&store)
        .unwrap()
        .iter()
        .map(|r| r.subject_id)
        .collect();
    assert_eq!(persisted, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn invalid_events_are_rejected_with_400() {
    let (_dir, paths) = setup("");
    let daemon = startup(&paths).await.unwrap();
    let server = tokio::spawn(serve(daemon));

    let response = send(
        &paths.socket_path,
        Request::Ingest {
            payload: json!({"timestamp": "2026-01-12T13:01:00Z"}),
        },
    )
    .await;
    let Response::Reply(reply) = response else {
        panic!("expected reply");
    };
    assert_eq!(reply.status.code(), 400);
    assert!(reply.message.contains("subject_id"), "{}", reply.message);

    send(&paths.socket_path, Request::Shutdown).await;
    server.await.unwrap().unwrap();
}
