use error_stack::{IntoReport, ResultExt};
use queue_fabric::QueueHandle;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{
    error::{ErrorKind, Result},
    layer::WorkerLogLayer,
    record::Description,
};

/// The well-known queue name every worker's log records are put onto and
/// the Dispatcher's log aggregator drains, one shared queue rather than one
/// per worker.
pub const LOG_QUEUE_NAME: &str = "__log__";

pub const LOG_QUEUE_CAPACITY: usize = 128;

/// Installs the process-wide subscriber for a worker: a console layer
/// (always on) plus a layer that relays every record onto `log_queue` for
/// the Dispatcher to fan out to console/remote sinks. Call once per worker
/// process, before spawning the supervised `run()` retry loop — `tracing`'s
/// global subscriber can only be installed once per process, so this must
/// not run again across restarts of the same worker.
pub fn install(log_level: &str, log_queue: QueueHandle, description: Description) -> Result<()> {
    let filter = EnvFilter::try_new(log_level)
        .into_report()
        .attach_printable_lazy(|| format!("invalid log level {log_level}"))
        .change_context(ErrorKind::Init)?;

    let (sender, receiver) = mpsc::unbounded_channel();
    let console_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(WorkerLogLayer::new(sender, description))
        .try_init()
        .into_report()
        .attach_printable("a global tracing subscriber was already installed")
        .change_context(ErrorKind::Init)?;

    tokio::spawn(crate::forwarder::run(receiver, log_queue));
    Ok(())
}
