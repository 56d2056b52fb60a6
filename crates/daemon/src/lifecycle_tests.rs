// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::protocol::{Request, Response};
use crate::server::handle_request;
use serde_json::json;
use sluice_engine::Status;
use tempfile::TempDir;

const CONFIG: &str = r#"
[flush]
period = "20ms"

[[stock]]
item = "A"
remaining = 2
"#;

fn setup(config: &str) -> (TempDir, Paths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(&dir.path().join("state"), &dir.path().join("sock"));
    std::fs::create_dir_all(&paths.state_dir).unwrap();
    std::fs::write(&paths.config_path, config).unwrap();
    (dir, paths)
}

#[tokio::test]
async fn startup_claims_files_and_shutdown_releases_them() {
    let (_dir, paths) = setup(CONFIG);

    let daemon = startup(&paths).await.unwrap();
    assert!(paths.socket_path.exists());
    let pid = std::fs::read_to_string(&paths.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert!(paths.state_dir.join("sluice.db").exists());

    daemon.shutdown().await.unwrap();
    assert!(!paths.socket_path.exists());
    assert!(!paths.lock_path.exists());
}

#[tokio::test]
async fn second_daemon_is_refused_without_touching_the_first() {
    let (_dir, paths) = setup(CONFIG);
    let first = startup(&paths).await.unwrap();

    let second = startup(&paths).await;

    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));
    assert!(paths.socket_path.exists());
    let pid = std::fs::read_to_string(&paths.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());

    first.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_config_fails_startup_and_cleans_up() {
    let (_dir, paths) = setup("[flush]\nbatch_size = 0\n");

    let result = startup(&paths).await;

    assert!(matches!(result, Err(LifecycleError::Config(_))));
    assert!(!paths.lock_path.exists());
    assert!(!paths.socket_path.exists());
}

#[tokio::test]
async fn requests_reach_the_engine() {
    let (_dir, paths) = setup(CONFIG);
    let daemon = startup(&paths).await.unwrap();
    let context = Arc::clone(&daemon.context);

    for expected in [Status::Ok, Status::Ok, Status::Gone] {
        let response = handle_request(
            &context,
            Request::Purchase {
                item: ItemId::from("A"),
            },
        )
        .await;
        let Response::Reply(reply) = response else {
            panic!("expected a reply");
        };
        assert_eq!(reply.status, expected);
    }

    let response = handle_request(
        &context,
        Request::Ingest {
            payload: json!({"user_id": 1, "timestamp": "2026-01-12T13:01:00Z"}),
        },
    )
    .await;
    assert!(matches!(response, Response::Reply(ref r) if r.status == Status::Accepted));

    let Response::Status { stock, outage, .. } = handle_request(&context, Request::Status).await
    else {
        panic!("expected status");
    };
    assert!(!outage);
    assert_eq!(stock.len(), 1);
    assert_eq!(stock[0].remaining, Some(0));
    assert_eq!(stock[0].allocations, 2);

    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn outage_request_toggles_the_switch() {
    let (_dir, paths) = setup(CONFIG);
    let daemon = startup(&paths).await.unwrap();
    let context = Arc::clone(&daemon.context);

    let response = handle_request(&context, Request::Outage { enabled: true }).await;
    assert_eq!(response, Response::Ok);
    assert!(context.outage.is_engaged());

    let Response::Reply(reply) = handle_request(
        &context,
        Request::Purchase {
            item: ItemId::from("A"),
        },
    )
    .await
    else {
        panic!("expected a reply");
    };
    assert_eq!(reply.status.code(), 500);

    handle_request(&context, Request::Outage { enabled: false }).await;
    assert!(!context.outage.is_engaged());

    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn configured_outage_starts_engaged() {
    let (_dir, paths) = setup("simulate_outage = true\n");
    let daemon = startup(&paths).await.unwrap();

    assert!(daemon.context.outage.is_engaged());

    daemon.shutdown().await.unwrap();
}
