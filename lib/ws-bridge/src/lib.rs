//! WebSocket gateway bridge worker, heartbeat sender, and remote log sink:
//! the out-of-cluster counterpart to `queue-fabric`/`shared-state`'s
//! in-cluster IPC, all going over the same gateway connection as one
//! control-packet-then-frames protocol.

mod config;
mod connection;
mod error;
mod heartbeat;
mod log_sink;
mod process;
mod pull;
mod push;

pub use config::{BridgeCommand, BridgeConfig, DataType, RpcUserType};
pub use error::{ErrorKind, Result};
pub use heartbeat::run as run_heartbeat;
pub use log_sink::WsLogSink;
pub use process::WsRobotProcess;
