use serde::{Deserialize, Serialize};

/// The subscription command a bridge worker sends immediately after opening
/// a WebSocket connection, and what the heartbeat sender sends to announce
/// itself on the `"heartbeat"` exchange. Wire format is JSON, not BSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Pull,
    Push,
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeType {
    Fanout,
    Topic,
}

impl Default for ExchangeType {
    fn default() -> Self {
        Self::Fanout
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPacket {
    pub command: CommandType,
    pub exchange: String,
    #[serde(default)]
    pub exchange_type: ExchangeType,
    pub robot_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub exchange_bind_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<serde_json::Value>,
}

/// The push-mode keep-alive frame: wire body is exactly `{"command":"ping"}`,
/// no exchange/robot/credential fields. Distinct from [`ControlPacket`]
/// because the gateway only inspects `command` on this frame and the other
/// fields would be noise on every tick of the ping timer.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Ping {
    command: CommandType,
}

impl Ping {
    pub fn new() -> Self {
        Self { command: CommandType::Ping }
    }
}

impl Default for Ping {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlPacket {
    pub fn new(command: CommandType, exchange: impl Into<String>, robot_name: impl Into<String>) -> Self {
        Self {
            command,
            exchange: exchange.into(),
            exchange_type: ExchangeType::default(),
            robot_name: robot_name.into(),
            username: String::new(),
            password: String::new(),
            exchange_bind_key: String::new(),
            message: None,
        }
    }

    /// `"<robot_name>.*"` for RPC clients subscribing under a topic exchange.
    pub fn client_bind_key(robot_name: &str) -> String {
        format!("{robot_name}.*")
    }

    /// `"*.<service_name>"` for RPC services subscribing under a topic exchange.
    pub fn service_bind_key(service_name: &str) -> String {
        format!("*.{service_name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_lowercase_command_names() {
        let packet = ControlPacket::new(CommandType::Pull, "messages", "arm-01");
        let json = serde_json::to_value(&packet).unwrap();
        assert_eq!(json["command"], "pull");
        assert_eq!(json["exchange_type"], "fanout");
        assert!(json.get("exchange_bind_key").is_none());
    }

    #[test]
    fn bind_keys_match_the_topic_rpc_convention() {
        assert_eq!(ControlPacket::client_bind_key("arm-01"), "arm-01.*");
        assert_eq!(ControlPacket::service_bind_key("grasp"), "*.grasp");
    }

    #[test]
    fn ping_serializes_to_exactly_one_field() {
        let json = serde_json::to_value(Ping::new()).unwrap();
        assert_eq!(json, serde_json::json!({"command": "ping"}));
    }
}
