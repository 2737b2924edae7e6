use std::path::PathBuf;

use clap::Parser;

/// Runs one topology document as a supervised group of workers.
#[derive(Debug, Parser)]
#[command(name = "robot-ctl", version, about)]
pub struct Args {
    /// Path to the topology YAML document.
    #[arg(long)]
    pub config: PathBuf,

    /// Skip the out-of-cluster WebSocket log sink; console logging only.
    /// Direct in-cluster broker log delivery is an external collaborator,
    /// not something this crate implements.
    #[arg(long)]
    pub in_cluster: bool,

    /// Identity forwarded into heartbeats, log records, and bridge control
    /// packets. Falls back to `ROBOT_NAME` inside the topology's own worker
    /// parameters when absent here.
    #[arg(long, env = "ROBOT_NAME")]
    pub robot_name: Option<String>,

    #[arg(long, env = "LOGLEVEL", default_value = "INFO")]
    pub log_level: String,
}
