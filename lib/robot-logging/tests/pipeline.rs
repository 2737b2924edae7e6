use queue_fabric::QueueBroker;

fn socket_path(label: &str) -> String {
    std::env::temp_dir()
        .join(format!("robot-logging-test-{label}-{}.sock", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned()
}

/// One test per binary: `robot_logging::install` sets the process-wide
/// `tracing` subscriber, which can only happen once per process.
#[tokio::test]
async fn emitted_records_reach_the_shared_log_queue() {
    let broker = QueueBroker::new(socket_path("log"));
    broker
        .declare_queue(robot_logging::LOG_QUEUE_NAME, robot_logging::LOG_QUEUE_CAPACITY)
        .await;
    let log_queue = broker.handle(robot_logging::LOG_QUEUE_NAME);
    tokio::spawn(broker.serve());

    robot_logging::install("info", log_queue.clone(), robot_logging::Description::default()).unwrap();

    tracing::info!("hello from the worker");

    let bytes = tokio::time::timeout(std::time::Duration::from_secs(1), log_queue.get())
        .await
        .expect("a log record should have arrived")
        .unwrap();
    let record = robot_logging::LogRecord::decode(&bytes).unwrap();
    assert_eq!(record.level, "INFO");
    assert_eq!(record.message, "hello from the worker");
}
