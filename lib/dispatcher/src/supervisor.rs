use std::sync::Arc;

use robot_process::{ProcessContext, RobotProcess};
use tokio_util::sync::CancellationToken;

const EXCEPTION_BACKOFF: std::time::Duration = std::time::Duration::from_secs(1);
const RESTART_BACKOFF: std::time::Duration = std::time::Duration::from_secs(5);

/// Runs one worker's lifecycle state machine: `Created -> Running ->
/// {ExitedOk | ExitedErr} -> (Restart after 5s | Terminate)`, gated on
/// `keep_alive`. An exception sleeps 1s (logged first), then, whether the
/// attempt ended in an exception or cleanly, `free_resources` runs,
/// `keep_alive` is checked, and if still alive the loop logs "restarting"
/// and sleeps 5s before calling `run` again. `shutdown` lets
/// `stop_process`/Dispatcher teardown cut the loop short at any suspension
/// point.
pub(crate) async fn run_supervised(
    name: String,
    mut worker: Box<dyn RobotProcess>,
    ctx: Arc<ProcessContext>,
    keep_alive: bool,
    shutdown: CancellationToken,
) {
    loop {
        tracing::info!(process = %name, "worker starting");

        let outcome = tokio::select! {
            result = worker.run(&ctx) => Some(result),
            () = shutdown.cancelled() => None,
        };

        let Some(result) = outcome else {
            tracing::info!(process = %name, "worker stopped (shutdown requested mid-run)");
            let _ = worker.free_resources(&ctx).await;
            return;
        };

        match &result {
            Ok(()) => tracing::info!(process = %name, "worker exited normally"),
            Err(error) => {
                tracing::error!(process = %name, ?error, "worker exited with an error");
                tokio::select! {
                    () = tokio::time::sleep(EXCEPTION_BACKOFF) => {}
                    () = shutdown.cancelled() => {
                        let _ = worker.free_resources(&ctx).await;
                        return;
                    }
                }
            }
        }

        if let Err(error) = worker.free_resources(&ctx).await {
            tracing::warn!(process = %name, ?error, "free_resources failed");
        }

        if !keep_alive {
            tracing::info!(process = %name, "keep_alive is false, terminating");
            return;
        }

        tracing::info!(process = %name, "restarting");
        tokio::select! {
            () = tokio::time::sleep(RESTART_BACKOFF) => {}
            () = shutdown.cancelled() => return,
        }
    }
}
