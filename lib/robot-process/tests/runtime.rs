use std::collections::HashMap;

use queue_fabric::QueueBroker;
use robot_process::{ProcessContext, WatcherHandle};
use rpc_models::Request;
use serde_json::json;

fn socket_path(label: &str) -> String {
    std::env::temp_dir()
        .join(format!("robot-process-test-{label}-{}.sock", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned()
}

fn watcher() -> WatcherHandle {
    WatcherHandle::new(None, "robot-1", "TestWorker")
}

#[tokio::test]
async fn publish_fans_out_to_every_subscriber_queue() {
    let broker = QueueBroker::new(socket_path("fanout"));
    broker.declare_queue("cmd_a", 10).await;
    broker.declare_queue("cmd_b", 10).await;
    let a = broker.handle("cmd_a");
    let b = broker.handle("cmd_b");
    tokio::spawn(broker.serve());

    let mut publish_queues = HashMap::new();
    publish_queues.insert("commands".to_owned(), vec![a.clone(), b.clone()]);

    let ctx = ProcessContext::new(
        "publisher",
        HashMap::new(),
        publish_queues,
        HashMap::new(),
        a.clone(),
        HashMap::new(),
        watcher(),
    );

    ctx.publish(json!({"go": true}), None, false).await.unwrap();

    let from_a: serde_json::Value = serde_json::from_slice(&a.get().await.unwrap()).unwrap();
    let from_b: serde_json::Value = serde_json::from_slice(&b.get().await.unwrap()).unwrap();
    assert_eq!(from_a, json!({"go": true}));
    assert_eq!(from_b, json!({"go": true}));
}

#[tokio::test]
async fn consume_without_a_name_requires_exactly_one_candidate() {
    let broker = QueueBroker::new(socket_path("ambiguous"));
    broker.declare_queue("q1", 10).await;
    broker.declare_queue("q2", 10).await;
    let q1 = broker.handle("q1");
    let q2 = broker.handle("q2");
    tokio::spawn(broker.serve());

    let mut consume_queues = HashMap::new();
    consume_queues.insert("q1".to_owned(), q1.clone());
    consume_queues.insert("q2".to_owned(), q2.clone());

    let ctx = ProcessContext::new(
        "consumer",
        consume_queues,
        HashMap::new(),
        HashMap::new(),
        q1,
        HashMap::new(),
        watcher(),
    );

    let result = ctx.consume(None, false).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn consume_with_clear_all_messages_returns_only_the_last_item() {
    let broker = QueueBroker::new(socket_path("drain"));
    broker.declare_queue("frames", 10).await;
    let frames = broker.handle("frames");
    tokio::spawn(broker.serve());

    frames.put(b"first".to_vec(), false).await.unwrap();
    frames.put(b"second".to_vec(), false).await.unwrap();
    frames.put(b"third".to_vec(), false).await.unwrap();

    let mut consume_queues = HashMap::new();
    consume_queues.insert("frames".to_owned(), frames.clone());

    let ctx = ProcessContext::new(
        "consumer",
        consume_queues,
        HashMap::new(),
        HashMap::new(),
        frames,
        HashMap::new(),
        watcher(),
    );

    let message = ctx.consume(None, true).await.unwrap();
    assert_eq!(message, b"third".to_vec());
}

#[tokio::test]
async fn is_full_requires_exactly_one_of_publish_or_consume_name() {
    let broker = QueueBroker::new(socket_path("isfull"));
    broker.declare_queue("q", 1).await;
    let q = broker.handle("q");
    tokio::spawn(broker.serve());

    let mut consume_queues = HashMap::new();
    consume_queues.insert("q".to_owned(), q.clone());

    let ctx = ProcessContext::new(
        "worker",
        consume_queues,
        HashMap::new(),
        HashMap::new(),
        q,
        HashMap::new(),
        watcher(),
    );

    assert!(ctx.is_full(None, None).await.is_err());
    assert!(ctx.is_full(Some("x"), Some("q")).await.is_err());
    assert!(!ctx.is_full(None, Some("q")).await.unwrap());
}

#[tokio::test]
async fn request_reply_round_trips_through_system_inboxes() {
    let broker = QueueBroker::new(socket_path("rpc"));
    broker.declare_queue("work", 10).await;
    broker.declare_queue("inbox_caller", 10).await;
    broker.declare_queue("inbox_responder", 10).await;
    let work = broker.handle("work");
    let inbox_caller = broker.handle("inbox_caller");
    let inbox_responder = broker.handle("inbox_responder");
    tokio::spawn(broker.serve());

    let mut caller_system_queues = HashMap::new();
    caller_system_queues.insert("caller".to_owned(), inbox_caller.clone());

    let mut caller_publish = HashMap::new();
    caller_publish.insert("work".to_owned(), vec![work.clone()]);

    let caller = ProcessContext::new(
        "caller",
        HashMap::new(),
        caller_publish,
        caller_system_queues,
        inbox_caller,
        HashMap::new(),
        watcher(),
    );

    let mut responder_consume = HashMap::new();
    responder_consume.insert("work".to_owned(), work.clone());
    let mut responder_system_queues = HashMap::new();
    responder_system_queues.insert("caller".to_owned(), broker.handle("inbox_caller"));

    let responder = ProcessContext::new(
        "responder",
        responder_consume,
        HashMap::new(),
        responder_system_queues,
        inbox_responder,
        HashMap::new(),
        watcher(),
    );

    let uid = caller
        .send_request(json!("get_position"), None, "position")
        .await
        .unwrap();

    let bytes = responder.consume(None, false).await.unwrap();
    let request = Request::from_bson(&bytes).unwrap();
    assert_eq!(request.uid, uid);
    assert_eq!(request.data, json!("get_position"));

    responder.respond_to(&request, json!([1, 1, 1])).await.unwrap();

    let reply = caller.wait_response(uid).await.unwrap();
    assert_eq!(reply, json!([1, 1, 1]));
}

#[tokio::test]
async fn wait_response_buffers_replies_that_arrive_out_of_order() {
    let broker = QueueBroker::new(socket_path("out-of-order"));
    broker.declare_queue("inbox", 10).await;
    let inbox = broker.handle("inbox");
    tokio::spawn(broker.serve());

    let ctx = ProcessContext::new(
        "caller",
        HashMap::new(),
        HashMap::new(),
        HashMap::new(),
        inbox.clone(),
        HashMap::new(),
        watcher(),
    );

    let request_a = Request::new("caller", "", json!("a")).unwrap();
    let request_b = Request::new("caller", "", json!("b")).unwrap();

    // Reply to the second request arrives first.
    inbox.put(request_b.to_bson().unwrap(), false).await.unwrap();
    inbox.put(request_a.to_bson().unwrap(), false).await.unwrap();

    let reply_a = ctx.wait_response(request_a.uid).await.unwrap();
    assert_eq!(reply_a, json!("a"));

    let reply_b = ctx.wait_response(request_b.uid).await.unwrap();
    assert_eq!(reply_b, json!("b"));
}

#[tokio::test]
async fn clear_queues_drains_only_the_marked_queues() {
    let broker = QueueBroker::new(socket_path("clear"));
    broker.declare_queue("keep", 10).await;
    broker.declare_queue("clear_me", 10).await;
    let keep = broker.handle("keep");
    let clear_me = broker.handle("clear_me");
    tokio::spawn(broker.serve());

    keep.put(b"stays".to_vec(), false).await.unwrap();
    clear_me.put(b"goes".to_vec(), false).await.unwrap();

    let mut consume_queues = HashMap::new();
    consume_queues.insert("keep".to_owned(), keep.clone());
    consume_queues.insert("clear_me".to_owned(), clear_me.clone());

    let ctx = ProcessContext::new(
        "worker",
        consume_queues,
        HashMap::new(),
        HashMap::new(),
        keep.clone(),
        HashMap::new(),
        watcher(),
    );

    ctx.mark_queue_for_clearing("clear_me");
    ctx.clear_queues().await;

    assert!(clear_me.is_empty().await.unwrap());
    assert!(!keep.is_empty().await.unwrap());
}

#[tokio::test]
async fn heartbeat_without_a_wired_outbox_does_not_panic() {
    let ctx = ProcessContext::new(
        "worker",
        HashMap::new(),
        HashMap::new(),
        HashMap::new(),
        queue_fabric::QueueHandle::new(socket_path("unused"), "unused"),
        HashMap::new(),
        watcher(),
    );

    ctx.heartbeat(json!({"status": "ok"}));
}
