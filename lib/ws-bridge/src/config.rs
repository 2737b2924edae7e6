use std::time::Duration;

use error_stack::ResultExt;
use rpc_models::ExchangeType;

use crate::error::{ErrorKind, Result};

/// `command_type` ∈ `{pull, push}`; any other value collapses onto `Push`
/// as a fallback, since the closed public set is two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeCommand {
    Pull,
    Push,
}

impl BridgeCommand {
    pub fn parse(value: &str) -> Self {
        match value {
            "pull" => Self::Pull,
            _ => Self::Push,
        }
    }
}

/// Pull-mode payload interpretation. `str`/`string` and `bytes`/`binary`
/// each collapse onto one variant, accepting either spelling for the same
/// behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Json,
    Str,
    Bytes,
    Request,
    BindRequest,
}

impl DataType {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "json" => Ok(Self::Json),
            "str" | "string" => Ok(Self::Str),
            "bytes" | "binary" => Ok(Self::Bytes),
            "request" => Ok(Self::Request),
            "bind_request" => Ok(Self::BindRequest),
            other => Err(error_stack::report!(ErrorKind::Configuration))
                .attach_printable(format!("unknown data_type '{other}'")),
        }
    }
}

/// Only meaningful alongside `ExchangeType::Topic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcUserType {
    Default,
    Client,
    Service,
}

impl RpcUserType {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "default" => Ok(Self::Default),
            "client" => Ok(Self::Client),
            "service" => Ok(Self::Service),
            other => Err(error_stack::report!(ErrorKind::Configuration))
                .attach_printable(format!("unknown rpc_user_type '{other}'")),
        }
    }
}

const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(1000);
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(1500);

/// Everything a bridge worker (or the heartbeat sender, which reuses the
/// same connection/control-packet machinery) needs, resolved once at
/// construction, including the `std::env::var(...).or(fallback)` credential
/// resolution chain.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub command: BridgeCommand,
    pub exchange: String,
    pub exchange_type: ExchangeType,
    pub url: String,
    pub robot_name: String,
    pub username: String,
    pub password: String,
    pub data_type: DataType,
    pub rpc_user_type: RpcUserType,
    pub service_name: String,
    pub ping_interval: Duration,
    pub connection_timeout: Duration,
}

/// Returns `None` for an absent or empty variable; empty-string env vars
/// are treated as unset so a fallback chain can keep trying.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

impl BridgeConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        command_type: &str,
        exchange: impl Into<String>,
        exchange_type: ExchangeType,
        url: Option<String>,
        robot_name: Option<String>,
        username: Option<String>,
        password: Option<String>,
        data_type: &str,
        rpc_user_type: Option<&str>,
        service_name: impl Into<String>,
        ping_interval: Option<Duration>,
        connection_timeout: Option<Duration>,
    ) -> Result<Self> {
        let rpc_user_type = match rpc_user_type {
            Some(value) => RpcUserType::parse(value)?,
            None => RpcUserType::Default,
        };
        if rpc_user_type != RpcUserType::Default && exchange_type != ExchangeType::Topic {
            return Err(error_stack::report!(ErrorKind::Configuration))
                .attach_printable("rpc_user_type is only valid with a topic exchange");
        }

        let url = url
            .or_else(|| env_var("WEBSOCKET_GATE_URL"))
            .ok_or_else(|| {
                error_stack::report!(ErrorKind::Configuration)
                    .attach_printable("no url given and WEBSOCKET_GATE_URL is not set")
            })?;
        let robot_name = robot_name.or_else(|| env_var("ROBOT_NAME")).unwrap_or_default();
        let username = username
            .or_else(|| env_var("RRF_USERNAME"))
            .or_else(|| env_var("ML_NAME"))
            .unwrap_or_default();
        let password = password
            .or_else(|| env_var("RRF_PASSWORD"))
            .or_else(|| env_var("ML_PASSWORD"))
            .unwrap_or_default();

        Ok(Self {
            command: BridgeCommand::parse(command_type),
            exchange: exchange.into(),
            exchange_type,
            url,
            robot_name,
            username,
            password,
            data_type: DataType::parse(data_type)?,
            rpc_user_type,
            service_name: service_name.into(),
            ping_interval: ping_interval.unwrap_or(DEFAULT_PING_INTERVAL),
            connection_timeout: connection_timeout.unwrap_or(DEFAULT_CONNECTION_TIMEOUT),
        })
    }

    /// The `exchange_bind_key` for a topic exchange.
    /// `None` for a fanout exchange (the control packet omits the field).
    pub fn bind_key(&self) -> Option<String> {
        if self.exchange_type != ExchangeType::Topic {
            return None;
        }
        match self.rpc_user_type {
            RpcUserType::Client => Some(rpc_models::ControlPacket::client_bind_key(&self.robot_name)),
            RpcUserType::Service => Some(rpc_models::ControlPacket::service_bind_key(&self.service_name)),
            RpcUserType::Default => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_rpc_user_type_without_topic_exchange() {
        let result = BridgeConfig::new(
            "pull",
            "messages",
            ExchangeType::Fanout,
            Some("ws://localhost".to_owned()),
            Some("arm-01".to_owned()),
            None,
            None,
            "json",
            Some("client"),
            "svc",
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn legacy_third_command_value_maps_to_push() {
        assert_eq!(BridgeCommand::parse("push_loop"), BridgeCommand::Push);
    }

    #[test]
    fn bind_key_picks_client_or_service_convention() {
        let config = BridgeConfig::new(
            "pull",
            "messages",
            ExchangeType::Topic,
            Some("ws://localhost".to_owned()),
            Some("arm-01".to_owned()),
            None,
            None,
            "request",
            Some("client"),
            "grasp",
            None,
            None,
        )
        .unwrap();
        assert_eq!(config.bind_key().as_deref(), Some("arm-01.*"));
    }
}
