use core::fmt;

/// Failure categories surfaced by the queue fabric.
///
/// Mirrors the narrow, single-purpose `ErrorKind` enums the rest of the
/// workspace uses (see `robot-process`, `ws-bridge`): one flat enum per
/// crate, formatted via `Display` and combined with `error_stack::Report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The broker could not bind its local socket or spawn a queue task.
    BrokerStart,
    /// A client could not dial the broker's local socket.
    Connect,
    /// A frame could not be written to the wire.
    Send,
    /// A frame could not be read from the wire, or the broker hung up.
    Receive,
    /// A queue name referenced by a handle does not exist in the broker.
    UnknownQueue,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrokerStart => fmt.write_str("could not start the queue broker"),
            Self::Connect => fmt.write_str("could not connect to the queue broker"),
            Self::Send => fmt.write_str("could not send a frame to the queue broker"),
            Self::Receive => fmt.write_str("could not receive a frame from the queue broker"),
            Self::UnknownQueue => fmt.write_str("queue does not exist"),
        }
    }
}

impl error_stack::Context for ErrorKind {}

pub type Result<T, C = ErrorKind> = error_stack::Result<T, C>;
