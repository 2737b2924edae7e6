use error_stack::{IntoReport, ResultExt};
use futures_util::{Sink, SinkExt};
use rpc_models::{CommandType, ControlPacket, Ping};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::{
    config::{BridgeCommand, BridgeConfig},
    error::{ErrorKind, Result},
};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
pub(crate) type WsError = tokio_tungstenite::tungstenite::Error;

/// Opens the WebSocket within `connection_timeout` and immediately sends the
/// control packet declaring subscription intent.
pub(crate) async fn open(config: &BridgeConfig) -> Result<WsStream> {
    let connect = tokio_tungstenite::connect_async(&config.url);
    let (mut stream, _response) = tokio::time::timeout(config.connection_timeout, connect)
        .await
        .into_report()
        .attach_printable("timed out connecting to the gateway")
        .change_context(ErrorKind::Transport)?
        .into_report()
        .attach_printable_lazy(|| format!("could not connect to {}", config.url))
        .change_context(ErrorKind::Transport)?;

    send_control_packet(&mut stream, config).await?;
    Ok(stream)
}

async fn send_control_packet<S>(sink: &mut S, config: &BridgeConfig) -> Result<()>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    let command = match config.command {
        BridgeCommand::Pull => CommandType::Pull,
        BridgeCommand::Push => CommandType::Push,
    };

    let mut packet = ControlPacket::new(command, config.exchange.clone(), config.robot_name.clone());
    packet.exchange_type = config.exchange_type;
    packet.username = config.username.clone();
    packet.password = config.password.clone();
    if let Some(bind_key) = config.bind_key() {
        packet.exchange_bind_key = bind_key;
    }

    send_json(sink, &packet).await
}

/// The push-mode ping frame: exactly `{"command":"ping"}`, sent every
/// `ping_interval`. Generic over the sink so it can be driven on a
/// [`futures_util::stream::SplitSink`] half held by the push-mode writer
/// loop or the heartbeat forwarder.
pub(crate) async fn send_ping<S>(sink: &mut S) -> Result<()>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    send_json(sink, &Ping::new()).await
}

pub(crate) async fn send_json<S, T>(sink: &mut S, value: &T) -> Result<()>
where
    S: Sink<Message, Error = WsError> + Unpin,
    T: serde::Serialize,
{
    let text = serde_json::to_string(value)
        .into_report()
        .attach_printable("could not encode control packet as JSON")
        .change_context(ErrorKind::Configuration)?;
    sink.send(Message::Text(text))
        .await
        .into_report()
        .attach_printable("could not send control packet")
        .change_context(ErrorKind::Transport)
}
