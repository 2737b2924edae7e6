use error_stack::{IntoReport, ResultExt};
use futures_util::StreamExt;
use robot_process::ProcessContext;
use rpc_models::{BindRequest, Request};
use tokio_tungstenite::tungstenite::Message;

use crate::{
    config::{BridgeConfig, DataType, RpcUserType},
    connection::WsStream,
    error::{ErrorKind, Result},
};

/// A single concurrent read loop over `stream`, dispatching each frame per
/// the gateway's pull-mode framing rules. Returns once the connection closes or a
/// protocol violation is seen; the caller's supervisor restarts the worker.
pub(crate) async fn run(mut stream: WsStream, config: &BridgeConfig, ctx: &ProcessContext) -> Result<()> {
    while let Some(message) = stream.next().await {
        let message = message
            .into_report()
            .attach_printable("pull mode: error reading a frame")
            .change_context(ErrorKind::Transport)?;

        match message {
            Message::Text(text) if text == "ping" => continue,
            Message::Text(other) => {
                return Err(error_stack::report!(ErrorKind::Transport))
                    .attach_printable(format!("unexpected text frame: {other}"));
            }
            Message::Binary(bytes) => handle_binary(&bytes, config, ctx).await?,
            Message::Close(_) => return Ok(()),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }
    Ok(())
}

async fn handle_binary(bytes: &[u8], config: &BridgeConfig, ctx: &ProcessContext) -> Result<()> {
    match (config.rpc_user_type, config.data_type) {
        (RpcUserType::Client, _) => {
            let request = Request::from_bson(bytes).change_context(ErrorKind::Transport)?;
            let data = request.data.clone();
            ctx.respond_to(&request, data)
                .await
                .change_context(ErrorKind::Transport)?;
        }
        (RpcUserType::Service, _) => {
            let bind = BindRequest::from_bson(bytes).change_context(ErrorKind::Transport)?;
            publish_bind_request(bind, ctx).await?;
        }
        (RpcUserType::Default, DataType::Json) => {
            let value: serde_json::Value = serde_json::from_slice(bytes)
                .into_report()
                .attach_printable("could not decode JSON payload")
                .change_context(ErrorKind::Transport)?;
            publish(value, ctx).await?;
        }
        (RpcUserType::Default, DataType::Str) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            publish(serde_json::Value::String(text), ctx).await?;
        }
        (RpcUserType::Default, DataType::Bytes) => {
            let value = serde_json::to_value(bytes)
                .into_report()
                .attach_printable("could not encode binary payload as JSON")
                .change_context(ErrorKind::Transport)?;
            publish(value, ctx).await?;
        }
        (RpcUserType::Default, DataType::Request) => {
            let request = Request::from_bson(bytes).change_context(ErrorKind::Transport)?;
            let value = serde_json::to_value(&request)
                .into_report()
                .attach_printable("could not re-encode Request as JSON")
                .change_context(ErrorKind::Transport)?;
            publish(value, ctx).await?;
        }
        (RpcUserType::Default, DataType::BindRequest) => {
            let bind = BindRequest::from_bson(bytes).change_context(ErrorKind::Transport)?;
            publish_bind_request(bind, ctx).await?;
        }
    }
    Ok(())
}

async fn publish(value: serde_json::Value, ctx: &ProcessContext) -> Result<()> {
    ctx.publish(value, None, false).await.change_context(ErrorKind::Transport)
}

async fn publish_bind_request(bind: BindRequest, ctx: &ProcessContext) -> Result<()> {
    let value = serde_json::json!({ "bind_key": bind.bind_key, "request": bind.request });
    publish(value, ctx).await
}
