use shared_state::{ObjectKind, StateBroker};

fn socket_path(label: &str) -> String {
    std::env::temp_dir()
        .join(format!("shared-state-test-{label}-{}.sock", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned()
}

#[tokio::test]
async fn dict_set_then_get_roundtrips() {
    let broker = StateBroker::new(socket_path("dict"));
    broker.add_shared_object("counters", ObjectKind::Dict).await.unwrap();
    let dict = broker.dict("counters");
    tokio::spawn(broker.serve());

    dict.set("hi_received", &2i64).await.unwrap();
    let value: Option<i64> = dict.get("hi_received").await.unwrap();
    assert_eq!(value, Some(2));
    assert_eq!(dict.get::<i64>("missing").await.unwrap(), None);
}

#[tokio::test]
async fn list_push_and_snapshot() {
    let broker = StateBroker::new(socket_path("list"));
    broker.add_shared_object("events", ObjectKind::List).await.unwrap();
    let list = broker.list("events");
    tokio::spawn(broker.serve());

    list.push(&"a".to_string()).await.unwrap();
    list.push(&"b".to_string()).await.unwrap();
    assert_eq!(list.len().await.unwrap(), 2);
    let snapshot: Vec<String> = list.snapshot().await.unwrap();
    assert_eq!(snapshot, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn value_cell_defaults_and_updates() {
    let broker = StateBroker::new(socket_path("value"));
    broker
        .add_shared_object("running", ObjectKind::ValueBool)
        .await
        .unwrap();
    let flag = broker.value::<bool>("running");
    tokio::spawn(broker.serve());

    assert_eq!(flag.get().await.unwrap(), false);
    flag.set(&true).await.unwrap();
    assert_eq!(flag.get().await.unwrap(), true);
}

#[tokio::test]
async fn lock_acquire_blocks_until_released() {
    let broker = StateBroker::new(socket_path("lock"));
    broker.add_shared_object("coarse", ObjectKind::Lock).await.unwrap();
    let lock = broker.lock("coarse");
    tokio::spawn(broker.serve());

    lock.acquire().await.unwrap();

    let contender = lock.clone();
    let waiter = tokio::spawn(async move { contender.acquire().await.unwrap() });

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    lock.release().await.unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
        .await
        .expect("waiter should have acquired the lock")
        .unwrap();
}

#[tokio::test]
async fn add_shared_object_rejects_duplicate_names() {
    let broker = StateBroker::new(socket_path("dup"));
    broker.add_shared_object("seen", ObjectKind::Dict).await.unwrap();
    let result = broker.add_shared_object("seen", ObjectKind::List).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn del_shared_object_on_absent_name_is_a_no_op() {
    let broker = StateBroker::new(socket_path("del"));
    broker.del_shared_object("never-existed").await;
}
