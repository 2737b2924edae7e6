use async_trait::async_trait;
use error_stack::{IntoReport, ResultExt};
use futures_util::SinkExt;
use robot_logging::{LogRecord, RemoteLogSink};
use tokio_tungstenite::tungstenite::Message;

use crate::{config::BridgeConfig, connection};

const LOG_EXCHANGE_DEFAULT: &str = "logstash";

fn log_exchange() -> String {
    std::env::var("LOG_EXCHANGE")
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| LOG_EXCHANGE_DEFAULT.to_owned())
}

/// Forwards encoded log records to the WebSocket gateway, for deployments
/// where the out-of-cluster destination is reached over the same bridge as
/// worker data traffic rather than a direct broker connection. One
/// connection is opened lazily on the first record and reused for
/// subsequent ones; a failed send drops the connection so the next record
/// reopens it.
pub struct WsLogSink {
    config: BridgeConfig,
    stream: Option<connection::WsStream>,
}

impl WsLogSink {
    pub fn new(mut config: BridgeConfig) -> Self {
        config.exchange = log_exchange();
        config.command = crate::config::BridgeCommand::Push;
        Self { config, stream: None }
    }

    async fn connected(&mut self) -> robot_logging::Result<&mut connection::WsStream> {
        if self.stream.is_none() {
            let stream = connection::open(&self.config)
                .await
                .change_context(robot_logging::ErrorKind::RemoteSink)?;
            self.stream = Some(stream);
        }
        Ok(self.stream.as_mut().expect("just populated"))
    }
}

#[async_trait]
impl RemoteLogSink for WsLogSink {
    async fn send(&mut self, record: &LogRecord) -> robot_logging::Result<()> {
        let bytes = record.to_json().change_context(robot_logging::ErrorKind::RemoteSink)?;
        let stream = self.connected().await?;

        let result = stream
            .send(Message::Binary(bytes))
            .await
            .into_report()
            .attach_printable("could not send a log record")
            .change_context(robot_logging::ErrorKind::RemoteSink);

        if result.is_err() {
            self.stream = None;
        }
        result
    }
}
