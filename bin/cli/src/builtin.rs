use std::time::Duration;

use error_stack::ResultExt;
use robot_process::RobotProcess;
use rpc_models::ExchangeType;
use topology_config::Topology;
use ws_bridge::{BridgeConfig, WsRobotProcess};

use crate::error::{ErrorKind, Result};

const WS_BRIDGE_TYPE: &str = "ws_bridge";

/// Builds the registry `robot-ctl` runs with. The only concrete worker type
/// this binary knows how to construct is the built-in WebSocket bridge,
/// registered for every topology process whose params declare
/// `type: ws_bridge`. Every other worker type — camera producers, packers,
/// ML inference workers, command senders — is an external collaborator; an
/// application embedding this workspace's libraries directly registers
/// those against `dispatcher::WorkerRegistry` itself. This thin binary only
/// runs topologies built entirely from built-ins.
pub fn build_registry(topology: &Topology, default_robot_name: &str) -> Result<dispatcher::WorkerRegistry> {
    let mut registry = dispatcher::WorkerRegistry::new();

    for (name, spec) in &topology.processes {
        let params = spec.params_as_json();
        let worker_type = params
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| configuration_error(format!(
                "process '{name}' has no 'type'; robot-ctl only runs built-in worker types"
            )))?;

        match worker_type {
            WS_BRIDGE_TYPE => {
                let config = parse_bridge_config(&params, default_robot_name)
                    .attach_printable_lazy(|| format!("building ws_bridge config for '{name}'"))?;
                registry.register(name.clone(), move |_params| {
                    Box::new(WsRobotProcess::new(config.clone())) as Box<dyn RobotProcess>
                });
            }
            other => {
                return Err(configuration_error(format!(
                    "process '{name}' declares unknown worker type '{other}'"
                )));
            }
        }
    }

    Ok(registry)
}

fn configuration_error(message: impl Into<String>) -> error_stack::Report<ErrorKind> {
    error_stack::report!(ErrorKind::Configuration).attach_printable(message.into())
}

fn get_str(params: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<String> {
    params.get(key).and_then(serde_json::Value::as_str).map(str::to_owned)
}

fn get_millis(params: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<Duration> {
    params.get(key).and_then(serde_json::Value::as_u64).map(Duration::from_millis)
}

/// A base config for the heartbeat sender and the remote log sink: both
/// force their own `exchange`/`command` once handed this, so only the
/// connection and credential fields resolved from the environment matter
/// here (`WEBSOCKET_GATE_URL`/`ROBOT_NAME`/`RRF_*`/`ML_*`).
pub fn gateway_config(default_robot_name: &str) -> Result<BridgeConfig> {
    BridgeConfig::new(
        "push",
        "heartbeat",
        ExchangeType::default(),
        None,
        Some(default_robot_name.to_owned()),
        None,
        None,
        "json",
        None,
        "",
        None,
        None,
    )
    .change_context(ErrorKind::Configuration)
}

fn parse_bridge_config(
    params: &serde_json::Map<String, serde_json::Value>,
    default_robot_name: &str,
) -> Result<BridgeConfig> {
    let command = get_str(params, "command")
        .ok_or_else(|| configuration_error("ws_bridge worker is missing 'command'"))?;
    let exchange = get_str(params, "exchange")
        .ok_or_else(|| configuration_error("ws_bridge worker is missing 'exchange'"))?;
    let exchange_type = match get_str(params, "exchange_type") {
        Some(value) => serde_json::from_value(serde_json::Value::String(value))
            .map_err(|_| configuration_error("ws_bridge worker has an invalid 'exchange_type'"))?,
        None => ExchangeType::default(),
    };
    let data_type = get_str(params, "data_type").unwrap_or_else(|| "json".to_owned());
    let robot_name = get_str(params, "robot_name").or_else(|| Some(default_robot_name.to_owned()));

    BridgeConfig::new(
        &command,
        exchange,
        exchange_type,
        get_str(params, "url"),
        robot_name,
        get_str(params, "username"),
        get_str(params, "password"),
        &data_type,
        get_str(params, "rpc_user_type").as_deref(),
        get_str(params, "service_name").unwrap_or_default(),
        get_millis(params, "ping_interval_ms"),
        get_millis(params, "connection_timeout_ms"),
    )
    .change_context(ErrorKind::Configuration)
}
