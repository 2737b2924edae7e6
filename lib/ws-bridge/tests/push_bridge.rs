use std::{collections::HashMap, time::Duration};

use futures_util::StreamExt;
use queue_fabric::QueueBroker;
use robot_process::{ProcessContext, RobotProcess, WatcherHandle};
use rpc_models::ExchangeType;
use tokio::net::TcpListener;
use ws_bridge::{BridgeConfig, WsRobotProcess};

fn socket_path(label: &str) -> String {
    std::env::temp_dir()
        .join(format!("ws-bridge-test-{label}-{}.sock", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned()
}

/// Spec scenario 5: a push bridge opens with the JSON control packet, then
/// forwards a queued binary payload, and pings with a minimal
/// `{"command":"ping"}` frame — not a full control packet — on its own
/// cadence regardless of whether the queue is idle or not.
#[tokio::test]
async fn push_mode_sends_control_packet_then_binary_then_a_minimal_ping_frame() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let control = ws.next().await.unwrap().unwrap();
        let control: serde_json::Value = serde_json::from_str(control.to_text().unwrap()).unwrap();
        assert_eq!(control["command"], "push");
        assert_eq!(control["exchange"], "messages");

        let data = ws.next().await.unwrap().unwrap();
        assert_eq!(data.into_data(), b"some_data".to_vec());

        // The ping body must be exactly `{"command":"ping"}` — no exchange,
        // robot_name, username, or password fields riding along.
        let ping = ws.next().await.unwrap().unwrap();
        let ping: serde_json::Value = serde_json::from_str(ping.to_text().unwrap()).unwrap();
        assert_eq!(ping, serde_json::json!({"command": "ping"}));
    });

    let broker = QueueBroker::new(socket_path("push"));
    broker.declare_queue("out", 4).await;
    let out = broker.handle("out");
    tokio::spawn(broker.serve());

    out.put(b"some_data".to_vec(), false).await.unwrap();

    let mut consume_queues = HashMap::new();
    consume_queues.insert("out".to_owned(), out.clone());

    let ctx = ProcessContext::new(
        "bridge",
        consume_queues,
        HashMap::new(),
        HashMap::new(),
        out,
        HashMap::new(),
        WatcherHandle::new(None, "robot-1", "bridge"),
    );

    let config = BridgeConfig::new(
        "push",
        "messages",
        ExchangeType::Fanout,
        Some(format!("ws://{addr}")),
        Some("robot-1".to_owned()),
        None,
        None,
        "json",
        None,
        "",
        Some(Duration::from_millis(30)),
        Some(Duration::from_secs(1)),
    )
    .unwrap();

    let mut worker = WsRobotProcess::new(config);
    let client = tokio::spawn(async move {
        let _ = worker.run(&ctx).await;
    });

    tokio::time::timeout(Duration::from_secs(2), server)
        .await
        .expect("server-side assertions timed out")
        .expect("server task panicked");

    client.abort();
}
