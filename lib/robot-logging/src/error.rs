use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `tracing_subscriber::registry().try_init()` failed — usually because a
    /// global subscriber was already installed in this process.
    Init,
    /// A log record could not be encoded/decoded for cross-process transport.
    Codec,
    /// The remote sink could not deliver a record.
    RemoteSink,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => fmt.write_str("could not install the log subscriber"),
            Self::Codec => fmt.write_str("could not encode or decode a log record"),
            Self::RemoteSink => fmt.write_str("remote log sink failed to deliver a record"),
        }
    }
}

impl error_stack::Context for ErrorKind {}

pub type Result<T, C = ErrorKind> = error_stack::Result<T, C>;
