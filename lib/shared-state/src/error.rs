use core::fmt;

/// Failure categories surfaced by the shared-state registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The broker could not bind its local socket.
    BrokerStart,
    /// A client could not dial the broker's local socket.
    Connect,
    /// A frame could not be written to the wire.
    Send,
    /// A frame could not be read from the wire, or the broker hung up.
    Receive,
    /// A handle referenced an object name the broker does not know about.
    UnknownObject,
    /// `add_shared_object` was called with a name that already exists.
    AlreadyExists,
    /// A handle's operation does not match the object's declared kind (e.g.
    /// a `DictHandle` built over a `Lock`).
    WrongKind,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrokerStart => fmt.write_str("could not start the shared-state broker"),
            Self::Connect => fmt.write_str("could not connect to the shared-state broker"),
            Self::Send => fmt.write_str("could not send a frame to the shared-state broker"),
            Self::Receive => {
                fmt.write_str("could not receive a frame from the shared-state broker")
            }
            Self::UnknownObject => fmt.write_str("shared object does not exist"),
            Self::AlreadyExists => fmt.write_str("shared object already exists"),
            Self::WrongKind => fmt.write_str("shared object is not of the expected kind"),
        }
    }
}

impl error_stack::Context for ErrorKind {}

pub type Result<T, C = ErrorKind> = error_stack::Result<T, C>;
