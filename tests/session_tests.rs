//! End-to-end session tests against a fake cluster.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use ops_relay::heal::types::{HealDriveInfo, HealResultItem, HealTaskStatus, Infos};
use ops_relay::trace::types::{TraceHttpStats, TraceResponseInfo};
use ops_relay::trace::TraceInfo;

mod common;

use common::{connect, read_until_close, start_relay, wait_for, FakeCluster};

fn call(path: &str, status: u16) -> TraceInfo {
    TraceInfo {
        node_name: "node-1".into(),
        func_name: "s3.GetObject".into(),
        path: path.into(),
        http: Some(TraceHttpStats {
            resp_info: TraceResponseInfo {
                status_code: Some(status),
                ..Default::default()
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn drives(online: usize, offline: usize) -> Infos {
    let state = |s: &str, i: usize| HealDriveInfo {
        uuid: format!("{s}-{i}"),
        endpoint: format!("/mnt/{s}{i}"),
        state: s.to_string(),
    };
    Infos {
        drives: (0..online)
            .map(|i| state("ok", i))
            .chain((0..offline).map(|i| state("offline", i)))
            .collect(),
    }
}

fn healed_object(name: &str) -> HealResultItem {
    HealResultItem {
        heal_item_type: "object".into(),
        bucket: "photos".into(),
        object: name.into(),
        parity_blocks: 2,
        data_blocks: 2,
        before: drives(3, 1),
        after: drives(4, 0),
        object_size: 2048,
        ..Default::default()
    }
}

fn close_code(frame: &Option<CloseFrame>) -> u16 {
    frame.as_ref().map(|f| u16::from(f.code)).unwrap_or_default()
}

#[tokio::test]
async fn test_trace_is_filtered_and_shortened() {
    let cluster = Arc::new(FakeCluster::with_traces(vec![
        call("/photos/cat.png", 200),
        call("/logs/today", 200),
        call("/Photos/dog.png", 404),
    ]));
    let (addr, _shutdown) = start_relay(cluster).await;

    let mut client = connect(addr, "trace?path=photos").await;
    let (messages, frame) = read_until_close(&mut client).await;

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["path"], "/photos/cat.png");
    assert_eq!(messages[0]["host"], "node-1");
    assert_eq!(messages[1]["statusCode"], 404);
    assert_eq!(messages[1]["statusMsg"], "Not Found");
    assert_eq!(close_code(&frame), 1000);
}

#[tokio::test]
async fn test_heal_force_stop_closes_normally() {
    let cluster = Arc::new(FakeCluster::default());
    let (addr, _shutdown) = start_relay(Arc::clone(&cluster)).await;

    let mut client = connect(addr, "heal/photos?force-stop=true").await;
    let (messages, frame) = read_until_close(&mut client).await;

    assert!(messages.is_empty());
    assert_eq!(close_code(&frame), 1000);
    assert_eq!(cluster.heal_start_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cluster.heal_status_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_heal_streams_cumulative_snapshots() {
    let cluster = Arc::new(FakeCluster::with_heal_batches(vec![
        HealTaskStatus {
            summary: "running".into(),
            items: vec![healed_object("a.png")],
            ..Default::default()
        },
        HealTaskStatus {
            summary: "finished".into(),
            items: vec![healed_object("b.png")],
            ..Default::default()
        },
    ]));
    let (addr, _shutdown) = start_relay(cluster).await;

    let mut client = connect(addr, "heal/photos?recursive=true").await;
    let (messages, frame) = read_until_close(&mut client).await;

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["itemsScanned"], 1);
    let last = &messages[1];
    assert_eq!(last["itemsScanned"], 2);
    assert_eq!(last["objectsHealed"], 2);
    assert_eq!(last["bytesScanned"], 4096);
    assert_eq!(last["healthBeforeCols"]["yellow"], 2);
    assert_eq!(last["healthAfterCols"]["green"], 2);
    assert_eq!(last["items"][1]["name"], "photos/b.png");
    assert_eq!(close_code(&frame), 1000);
}

#[tokio::test]
async fn test_heal_stopped_by_cluster_closes_with_error() {
    let cluster = Arc::new(FakeCluster::with_heal_batches(vec![HealTaskStatus {
        summary: "stopped".into(),
        failure_detail: "disk quorum lost".into(),
        ..Default::default()
    }]));
    let (addr, _shutdown) = start_relay(cluster).await;

    let mut client = connect(addr, "heal/photos").await;
    let (messages, frame) = read_until_close(&mut client).await;

    assert_eq!(messages.len(), 1);
    assert_eq!(close_code(&frame), 1011);
    assert_eq!(frame.unwrap().reason.as_str(), "heal stopped: disk quorum lost");
}

#[tokio::test]
async fn test_embedded_source_error_closes_with_1011() {
    let cluster = Arc::new(FakeCluster::with_traces(vec![call("/a", 200)]));
    *cluster.trace_error.lock().unwrap() = Some(ops_relay::stream::SourceError::Stream("node-2 unreachable".into()));
    let (addr, _shutdown) = start_relay(cluster).await;

    let mut client = connect(addr, "trace").await;
    let (messages, frame) = read_until_close(&mut client).await;

    assert_eq!(messages.len(), 1);
    assert_eq!(close_code(&frame), 1011);
    assert!(frame.unwrap().reason.as_str().contains("node-2 unreachable"));
}

#[tokio::test]
async fn test_malformed_query_rejected_before_upgrade() {
    let cluster = Arc::new(FakeCluster::default());
    let (addr, _shutdown) = start_relay(Arc::clone(&cluster)).await;

    let err = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/heal/photos?recursive=yes"))
        .await
        .unwrap_err();
    match err {
        WsError::Http(response) => assert_eq!(response.status(), 400),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(cluster.heal_start_calls.load(Ordering::SeqCst), 0);

    let client = reqwest::Client::new();
    let res = client
        .get(format!("http://{addr}/ws/health-info"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "missing required parameter 'deadline'");

    let res = client
        .get(format!("http://{addr}/ws/heal/photos?force-start=1&force-stop=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let res = client.get(format!("http://{addr}/ws/tenants")).send().await.unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_client_close_cancels_source() {
    let cluster = Arc::new(FakeCluster::with_traces(vec![call("/a", 200)]));
    cluster.hold_open.store(true, Ordering::SeqCst);
    let (addr, _shutdown) = start_relay(Arc::clone(&cluster)).await;

    let mut client = connect(addr, "trace").await;
    let first = futures_util::StreamExt::next(&mut client).await.unwrap().unwrap();
    assert!(matches!(first, Message::Text(_)));

    client
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        })))
        .await
        .unwrap();

    assert!(wait_for(&cluster.source_cancelled, Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_shutdown_closes_live_sessions() {
    let cluster = Arc::new(FakeCluster::default());
    cluster.hold_open.store(true, Ordering::SeqCst);
    let (addr, shutdown) = start_relay(Arc::clone(&cluster)).await;

    let mut client = connect(addr, "trace").await;
    // Give the session time to open its source.
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    let (messages, frame) = read_until_close(&mut client).await;
    assert!(messages.is_empty());
    assert_eq!(close_code(&frame), 1000);
    assert!(wait_for(&cluster.source_cancelled, Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_health_endpoint() {
    let cluster = Arc::new(FakeCluster::default());
    let (addr, _shutdown) = start_relay(cluster).await;

    let res = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["activeSessions"], 0);
}
