use queue_fabric::QueueBroker;

fn socket_path(label: &str) -> String {
    std::env::temp_dir()
        .join(format!("queue-fabric-test-{label}-{}.sock", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned()
}

#[tokio::test]
async fn put_then_get_roundtrips_the_payload() {
    let broker = QueueBroker::new(socket_path("put-get"));
    broker.declare_queue("telemetry", 4).await;
    let handle = broker.handle("telemetry");
    tokio::spawn(broker.serve());

    handle.put(b"hello".to_vec(), false).await.unwrap();
    let item = handle.get().await.unwrap();
    assert_eq!(item, b"hello");
}

#[tokio::test]
async fn try_get_on_empty_queue_returns_none() {
    let broker = QueueBroker::new(socket_path("try-get"));
    broker.declare_queue("commands", 4).await;
    let handle = broker.handle("commands");
    tokio::spawn(broker.serve());

    assert_eq!(handle.try_get().await.unwrap(), None);
    handle.put(b"x".to_vec(), false).await.unwrap();
    assert_eq!(handle.try_get().await.unwrap(), Some(b"x".to_vec()));
    assert_eq!(handle.try_get().await.unwrap(), None);
}

#[tokio::test]
async fn clear_on_overflow_drops_the_oldest_items() {
    let broker = QueueBroker::new(socket_path("overflow"));
    broker.declare_queue("events", 2).await;
    let handle = broker.handle("events");
    tokio::spawn(broker.serve());

    handle.put(b"1".to_vec(), true).await.unwrap();
    handle.put(b"2".to_vec(), true).await.unwrap();
    // Queue is now full at capacity 2; a clear_on_overflow put must drain
    // before admitting, never block.
    handle.put(b"3".to_vec(), true).await.unwrap();

    assert_eq!(handle.len().await.unwrap(), 1);
    assert_eq!(handle.try_get().await.unwrap(), Some(b"3".to_vec()));
}

#[tokio::test]
async fn try_put_reports_false_once_the_queue_is_full() {
    let broker = QueueBroker::new(socket_path("try-put"));
    broker.declare_queue("logs", 1).await;
    let handle = broker.handle("logs");
    tokio::spawn(broker.serve());

    assert!(handle.try_put(b"first".to_vec()).await.unwrap());
    assert!(!handle.try_put(b"second".to_vec()).await.unwrap());
    assert_eq!(handle.get().await.unwrap(), b"first");
}

#[tokio::test]
async fn a_blocked_get_is_woken_by_a_later_put() {
    let broker = QueueBroker::new(socket_path("blocked-get"));
    broker.declare_queue("rpc", 1).await;
    let handle = broker.handle("rpc");
    tokio::spawn(broker.serve());

    let waiter = handle.clone();
    let getter = tokio::spawn(async move { waiter.get().await.unwrap() });

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    handle.put(b"late".to_vec(), false).await.unwrap();

    let item = tokio::time::timeout(std::time::Duration::from_secs(1), getter)
        .await
        .expect("getter should have resolved")
        .unwrap();
    assert_eq!(item, b"late");
}

#[tokio::test]
async fn unknown_queue_surfaces_as_an_error() {
    let broker = QueueBroker::new(socket_path("unknown"));
    broker.declare_queue("known", 1).await;
    let handle = broker.handle("does-not-exist");
    tokio::spawn(broker.serve());

    let result = handle.get().await;
    assert!(result.is_err());
}
