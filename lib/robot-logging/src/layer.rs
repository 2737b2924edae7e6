use chrono::Utc;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::record::{Description, LogRecord};

/// Formats every event into a [`LogRecord`] and hands it to an unbounded
/// local channel a [`crate::forwarder`] task drains. Never blocks the
/// call site: `UnboundedSender::send` only fails if the forwarder task has
/// already been dropped, in which case the record is silently lost (the
/// process is shutting down).
///
/// Backpressure (the shared log queue's own capacity) is checked at the
/// broker queue (see `crate::forwarder`), not here: this layer's own
/// channel is unbounded so the `tracing` call site is never the thing that
/// blocks.
pub struct WorkerLogLayer {
    sender: mpsc::UnboundedSender<LogRecord>,
    description: Description,
}

impl WorkerLogLayer {
    pub fn new(sender: mpsc::UnboundedSender<LogRecord>, description: Description) -> Self {
        Self { sender, description }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn core::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else if self.message.is_empty() {
            self.message = format!("{}={:?}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for WorkerLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let record = LogRecord {
            level: event.metadata().level().to_string().to_uppercase(),
            logger: event.metadata().target().to_owned(),
            message: visitor.message,
            timestamp: Utc::now(),
            description: self.description.clone(),
        };

        let _ = self.sender.send(record);
    }
}
