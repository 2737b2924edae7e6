use core::fmt;

/// Everything a bridge worker can fail on is either a bad parameterization
/// (caught at construction) or a connection problem (caught per-attempt and
/// handed back to the Dispatcher's supervisor to retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown `command_type`/`data_type`/`rpc_user_type`, or a `rpc_user_type`
    /// requested without a topic exchange.
    Configuration,
    /// Connect timeout, remote close, unexpected text frame, or a local
    /// queue failure while the connection is open.
    Transport,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => fmt.write_str("ws-bridge worker misconfigured"),
            Self::Transport => fmt.write_str("ws-bridge connection failed"),
        }
    }
}

impl error_stack::Context for ErrorKind {}

pub type Result<T, C = ErrorKind> = error_stack::Result<T, C>;
