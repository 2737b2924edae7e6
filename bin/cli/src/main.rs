mod args;
mod builtin;
mod error;

use std::sync::Arc;

use clap::Parser;
use error_stack::{IntoReport, ResultExt};

use crate::{
    args::Args,
    error::{ErrorKind, Result},
};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{report:?}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let topology = topology_config::load_path(&args.config).change_context(ErrorKind::Configuration)?;
    let robot_name = args.robot_name.clone().unwrap_or_else(|| "robot".to_owned());

    let registry = builtin::build_registry(&topology, &robot_name)?;

    let options = dispatcher::DispatcherOptions {
        robot_name: robot_name.clone(),
        heartbeat: !args.in_cluster,
        log_level: args.log_level.clone(),
        ..Default::default()
    };

    let dispatcher = dispatcher::Dispatcher::build(&topology, &registry, options)
        .await
        .change_context(ErrorKind::Configuration)?;

    let description = topology
        .description
        .as_ref()
        .map(|description| robot_logging::Description {
            project: description.project.clone(),
            subsystem: description.subsystem.clone(),
            robot: description.robot.clone(),
        })
        .unwrap_or_default();
    robot_logging::install(&args.log_level, dispatcher.log_queue(), description)
        .change_context(ErrorKind::Configuration)?;

    if !args.in_cluster {
        let sink_config = builtin::gateway_config(&robot_name)?;
        dispatcher
            .set_remote_log_sink(Box::new(ws_bridge::WsLogSink::new(sink_config)))
            .await;
    }

    let dispatcher = Arc::new(dispatcher);
    dispatcher.clone().run().await.change_context(ErrorKind::Runtime)?;

    if !args.in_cluster {
        if let Some(outbox) = dispatcher.watcher_outbox() {
            let heartbeat_config = builtin::gateway_config(&robot_name)?;
            tokio::spawn(ws_bridge::run_heartbeat(outbox, heartbeat_config));
        }
    }

    tokio::signal::ctrl_c()
        .await
        .into_report()
        .change_context(ErrorKind::Runtime)?;
    dispatcher.shutdown();
    Ok(())
}
