//! Worker runtime contract: bounded-queue `publish`/`consume` with
//! multi-subscriber fan-out, request/response correlation over a per-worker
//! system inbox, heartbeats, and resource teardown.

mod context;
mod error;
mod process;
mod shared;
mod watcher;

pub use context::ProcessContext;
pub use error::{ErrorKind, Result};
pub use process::RobotProcess;
pub use shared::SharedHandle;
pub use watcher::WatcherHandle;
