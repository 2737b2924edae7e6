use error_stack::{IntoReport, ResultExt};
use futures_util::StreamExt;
use robot_process::ProcessContext;
use rpc_models::Request;
use tokio_tungstenite::tungstenite::Message;

use crate::{
    config::{BridgeConfig, RpcUserType},
    connection::{self, WsStream},
    error::{ErrorKind, Result},
};

/// Push mode drives the connection with two cooperative tasks: pinging and
/// draining the outbound queue both need the write half of the socket, so
/// they are merged into one `writer_loop` that `select!`s between the ping
/// timer and the queue. The silent receiver keeps its own read half and
/// only watches for `Close`. Whichever task returns first tears the
/// connection down.
pub(crate) async fn run(stream: WsStream, config: &BridgeConfig, ctx: &ProcessContext) -> Result<()> {
    let (sink, source) = stream.split();

    tokio::select! {
        result = writer_loop(sink, config, ctx) => result,
        result = silent_receiver(source) => result,
    }
}

async fn writer_loop(
    mut sink: futures_util::stream::SplitSink<WsStream, Message>,
    config: &BridgeConfig,
    ctx: &ProcessContext,
) -> Result<()> {
    let mut ping_timer = tokio::time::interval(config.ping_interval);
    ping_timer.tick().await;

    // Held outside the loop and polled by reference: `ctx.consume` is not
    // cancel-safe (the broker roundtrip already sent the `Get` request by
    // the time a reply is awaited), so dropping it on every ping tick that
    // wins the select would strand an unconsumed reply in the broker. Kept
    // alive across iterations, a losing tick just leaves it pending.
    let mut consume_fut = Box::pin(ctx.consume(None, false));

    loop {
        tokio::select! {
            _ = ping_timer.tick() => {
                connection::send_ping(&mut sink).await?;
            }
            bytes = &mut consume_fut => {
                let bytes = bytes.change_context(ErrorKind::Transport)?;
                let payload = encode_payload(bytes, config)?;
                sink.send(Message::Binary(payload))
                    .await
                    .into_report()
                    .attach_printable("could not send a payload frame")
                    .change_context(ErrorKind::Transport)?;
                consume_fut.set(ctx.consume(None, false));
            }
        }
    }
}

/// For an RPC client the queued bytes are a plain JSON value produced by
/// `ProcessContext::publish`; they are re-wrapped as a fresh [`Request`] and
/// re-encoded as BSON here, since the gateway expects client traffic framed
/// as a `Request`. Service/default traffic is already correctly encoded by
/// whatever queued it and is forwarded verbatim.
fn encode_payload(bytes: Vec<u8>, config: &BridgeConfig) -> Result<Vec<u8>> {
    if config.rpc_user_type != RpcUserType::Client {
        return Ok(bytes);
    }

    let data: serde_json::Value = serde_json::from_slice(&bytes)
        .into_report()
        .attach_printable("could not decode queued payload as JSON")
        .change_context(ErrorKind::Transport)?;
    let request = Request::new(config.robot_name.clone(), config.service_name.clone(), data)
        .change_context(ErrorKind::Transport)?;
    request.to_bson().change_context(ErrorKind::Transport)
}

async fn silent_receiver(mut source: futures_util::stream::SplitStream<WsStream>) -> Result<()> {
    while let Some(message) = source.next().await {
        let message = message
            .into_report()
            .attach_printable("push mode: error reading a frame")
            .change_context(ErrorKind::Transport)?;
        if matches!(message, Message::Close(_)) {
            return Ok(());
        }
    }
    Ok(())
}
