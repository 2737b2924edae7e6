//! Cross-process shared-state registry: `dict`/`list`/`Lock`/`Value:T` cells
//! allocated by the Dispatcher and referenced by every worker that declares
//! them. Each cell is owned by a per-object broker task reached over an
//! `interprocess` local socket rather than shared memory, for the same
//! reason `queue-fabric` dials rather than shares memory: consuming
//! processes are independently spawned OS processes.

mod broker;
mod error;
mod handle;
mod protocol;
mod transport;

pub use broker::StateBroker;
pub use error::{ErrorKind, Result};
pub use handle::{DictHandle, ListHandle, LockHandle, ValueHandle};
pub use protocol::ObjectKind;
