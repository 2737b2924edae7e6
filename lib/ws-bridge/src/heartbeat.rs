use std::time::Duration;

use error_stack::{IntoReport, ResultExt};
use futures_util::{SinkExt, StreamExt};
use queue_fabric::QueueHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::warn;

use crate::{
    config::{BridgeCommand, BridgeConfig},
    connection::{self, WsStream},
    error::{ErrorKind, Result},
};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const HEARTBEAT_EXCHANGE: &str = "heartbeat";

/// Forwards the watcher's heartbeat queue to the gateway over its own push
/// connection. Never returns: on any connection failure it logs and
/// retries after a fixed delay, same as the log aggregator's
/// "loop forever, log errors, keep the process alive" style.
pub async fn run(outbox: QueueHandle, mut config: BridgeConfig) {
    config.exchange = HEARTBEAT_EXCHANGE.to_owned();
    config.command = BridgeCommand::Push;

    loop {
        if let Err(error) = run_once(&outbox, &config).await {
            warn!(?error, "heartbeat connection dropped, reconnecting");
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn run_once(outbox: &QueueHandle, config: &BridgeConfig) -> Result<()> {
    let stream = connection::open(config).await?;
    let (sink, source) = stream.split();

    tokio::select! {
        result = forward_loop(sink, outbox, config) => result,
        result = silent_receiver(source) => result,
    }
}

async fn forward_loop(
    mut sink: futures_util::stream::SplitSink<WsStream, Message>,
    outbox: &QueueHandle,
    config: &BridgeConfig,
) -> Result<()> {
    let mut ping_timer = tokio::time::interval(config.ping_interval);
    ping_timer.tick().await;

    // See the matching comment in push.rs: `outbox.get()` is not
    // cancel-safe, so it is held across loop iterations rather than
    // recreated inside `select!` on every ping tick.
    let mut get_fut = Box::pin(outbox.get());

    loop {
        tokio::select! {
            _ = ping_timer.tick() => {
                connection::send_ping(&mut sink).await?;
            }
            message = &mut get_fut => {
                let bytes = message.change_context(ErrorKind::Transport)?;
                sink.send(Message::Binary(bytes))
                    .await
                    .into_report()
                    .attach_printable("could not send a heartbeat frame")
                    .change_context(ErrorKind::Transport)?;
                get_fut.set(outbox.get());
            }
        }
    }
}

async fn silent_receiver(mut source: futures_util::stream::SplitStream<WsStream>) -> Result<()> {
    while let Some(message) = source.next().await {
        let message = message
            .into_report()
            .attach_printable("heartbeat: error reading a frame")
            .change_context(ErrorKind::Transport)?;
        if matches!(message, Message::Close(_)) {
            return Ok(());
        }
    }
    Ok(())
}
