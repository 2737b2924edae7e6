use async_trait::async_trait;
use error_stack::ResultExt;
use robot_process::{ProcessContext, RobotProcess};

use crate::{
    config::{BridgeCommand, BridgeConfig},
    connection, pull, push,
};

/// A worker that bridges one topology queue to/from the WebSocket gateway.
/// Reconnects on every failed attempt; the Dispatcher's supervisor decides
/// whether and when to restart the worker itself.
pub struct WsRobotProcess {
    config: BridgeConfig,
}

impl WsRobotProcess {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RobotProcess for WsRobotProcess {
    async fn run(&mut self, ctx: &ProcessContext) -> robot_process::Result<()> {
        let stream = connection::open(&self.config)
            .await
            .change_context(robot_process::ErrorKind::Transport)?;

        match self.config.command {
            BridgeCommand::Pull => pull::run(stream, &self.config, ctx)
                .await
                .change_context(robot_process::ErrorKind::Transport),
            BridgeCommand::Push => push::run(stream, &self.config, ctx)
                .await
                .change_context(robot_process::ErrorKind::Transport),
        }
    }
}
