use queue_fabric::QueueHandle;
use rpc_models::HeartbeatMessage;

/// A worker's heartbeat outbox. `None` when the topology wires no watcher
/// for this worker (the common case off-cluster); `heartbeat` then silently
/// no-ops rather than erroring, so the call always succeeds from the
/// caller's point of view.
///
/// `notify` fires the delivery onto its own `tokio::spawn`ed task so a
/// worker's own control loop never stalls on heartbeat delivery.
#[derive(Clone)]
pub struct WatcherHandle {
    outbox: Option<QueueHandle>,
    robot_name: String,
    process_class: String,
}

impl WatcherHandle {
    pub fn new(
        outbox: Option<QueueHandle>,
        robot_name: impl Into<String>,
        process_class: impl Into<String>,
    ) -> Self {
        Self {
            outbox,
            robot_name: robot_name.into(),
            process_class: process_class.into(),
        }
    }

    pub fn notify(&self, process_name: &str, data: serde_json::Value) {
        let Some(outbox) = self.outbox.clone() else {
            return;
        };
        let message = HeartbeatMessage::now(
            self.robot_name.clone(),
            process_name.to_owned(),
            self.process_class.clone(),
            data,
        );

        tokio::spawn(async move {
            let payload = match message.to_bson() {
                Ok(bytes) => bytes,
                Err(error) => {
                    tracing::warn!(?error, "could not encode heartbeat message");
                    return;
                }
            };

            match outbox.try_put(payload).await {
                Ok(true) => {}
                Ok(false) => tracing::warn!("heartbeat outbox overloaded, dropping heartbeat"),
                Err(error) => tracing::warn!(?error, "could not deliver heartbeat"),
            }
        });
    }
}
