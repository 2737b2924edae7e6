use async_trait::async_trait;

use crate::{context::ProcessContext, error::Result};

/// User-implemented worker body: the abstract `run`, the `close_objects`
/// override hook (default no-op), and `free_resources` (`close_objects`
/// then `clear_queues`, invoked by the supervisor on every exit, whether
/// normal or by exception).
///
/// The supervised restart loop itself (`Created -> Running -> {ExitedOk |
/// ExitedErr} -> (Restart after 5s | Terminate)`) is not part of this
/// trait; it lives in the Dispatcher's supervisor, which owns the decision
/// of whether to call `run` again.
#[async_trait]
pub trait RobotProcess: Send {
    /// The worker's main loop. Returning `Ok(())` or `Err` both end this
    /// attempt; the supervisor decides whether to restart.
    async fn run(&mut self, ctx: &ProcessContext) -> Result<()>;

    /// Overridden by concrete workers that hold resources beyond their
    /// queues and shared state (file handles, device connections). Default
    /// is a no-op.
    async fn close_objects(&mut self, _ctx: &ProcessContext) -> Result<()> {
        Ok(())
    }

    /// Runs teardown: `close_objects` then a drain of every queue marked
    /// via `ProcessContext::mark_queue_for_clearing`. Called by the
    /// supervisor after `run` returns, whether it succeeded or failed.
    async fn free_resources(&mut self, ctx: &ProcessContext) -> Result<()> {
        self.close_objects(ctx).await?;
        ctx.clear_queues().await;
        Ok(())
    }
}
