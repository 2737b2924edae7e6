//! Topology construction and worker supervision: parses nothing itself
//! (`topology_config` owns that) but turns a parsed [`topology_config::Topology`]
//! into a running set of queue/shared-state brokers and supervised worker
//! tasks.

mod backpressure;
mod constants;
mod dispatcher;
mod endpoint;
mod error;
mod registry;
mod supervisor;

pub use constants::SYSTEM_INBOX_CAPACITY;
pub use dispatcher::{Dispatcher, DispatcherOptions};
pub use error::{ErrorKind, Result};
pub use registry::{WorkerFactory, WorkerRegistry};
