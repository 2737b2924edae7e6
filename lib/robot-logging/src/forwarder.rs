use queue_fabric::QueueHandle;
use tokio::sync::mpsc;

use crate::record::LogRecord;

/// Drains the local, in-process channel [`crate::layer::WorkerLogLayer`]
/// feeds and relays each record onto the shared, cross-process log queue
/// via a non-blocking `try_put`. The capacity check happens inside the
/// broker task that owns the queue rather than racily in the caller.
pub async fn run(mut records: mpsc::UnboundedReceiver<LogRecord>, log_queue: QueueHandle) {
    while let Some(record) = records.recv().await {
        let encoded = match record.encode() {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(?error, "dropping log record: could not encode it");
                continue;
            }
        };

        match log_queue.try_put(encoded).await {
            Ok(true) => {}
            Ok(false) => {
                eprintln!("WARNING! Log queue overloaded, message wasn't delivered");
            }
            Err(error) => {
                eprintln!("Attention: logger exception - record was not written! Reason: {error:?}");
            }
        }
    }
}
