//! Cross-process bounded queue fabric.
//!
//! Every physical queue lives inside a single [`QueueBroker`] task running in
//! the Dispatcher process; worker processes hold [`QueueHandle`]s that dial
//! the broker's local socket per call. This is the cross-process analogue of
//! `lib/nano`'s client/server split, with `interprocess` + length-delimited
//! bincode framing standing in for `nng` so that blocking, bounded-capacity
//! admission (and `clear_on_overflow` draining) can be implemented as plain
//! Rust control flow inside the owning task rather than pushed onto the wire
//! protocol.

mod broker;
mod error;
mod handle;
mod protocol;
mod transport;

pub use broker::QueueBroker;
pub use error::{ErrorKind, Result};
pub use handle::QueueHandle;
