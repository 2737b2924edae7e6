use async_trait::async_trait;
use queue_fabric::QueueHandle;

use crate::record::LogRecord;

/// Where the Dispatcher forwards aggregated log records once console output
/// has already happened. `dispatcher`/`ws-bridge` provide the concrete
/// implementation (direct broker connection in-cluster, WebSocket gateway
/// otherwise) since resolving credentials and the gateway URL is their
/// concern, not this crate's.
#[async_trait]
pub trait RemoteLogSink: Send {
    async fn send(&mut self, record: &LogRecord) -> crate::Result<()>;
}

/// Drains the shared log queue forever, printing every record to the
/// console (always) and forwarding to `remote` when credentials resolved
/// one.
pub async fn run(log_queue: QueueHandle, mut remote: Option<Box<dyn RemoteLogSink>>) {
    loop {
        let bytes = match log_queue.get().await {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::error!(?error, "log aggregator could not read the log queue");
                return;
            }
        };

        let record = match LogRecord::decode(&bytes) {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(?error, "dropping unreadable log record");
                continue;
            }
        };

        println!("{}:{}:{}", record.level, record.logger, record.message);

        if let Some(sink) = remote.as_mut() {
            if let Err(error) = sink.send(&record).await {
                tracing::warn!(?error, "remote log sink failed to deliver a record");
            }
        }
    }
}
