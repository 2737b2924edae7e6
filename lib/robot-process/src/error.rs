use std::fmt;

/// Worker runtime error taxonomy: misuse of the publish/consume/RPC
/// contract, the 50-buffered-reply overflow `wait_response` guards against,
/// and transport failures from the underlying queue/shared-object handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No publish (or consume) endpoint at all, or the name is omitted with
    /// more than one candidate, or a given name does not exist.
    Configuration,
    /// A request's buffered-reply map grew past the 50-reply cap.
    RpcOverflow,
    /// A queue or shared-object handle returned an error.
    Transport,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => fmt.write_str("worker runtime misconfigured"),
            Self::RpcOverflow => fmt.write_str("too many buffered RPC replies"),
            Self::Transport => fmt.write_str("queue or shared-object transport failed"),
        }
    }
}

impl error_stack::Context for ErrorKind {}

pub type Result<T, C = ErrorKind> = error_stack::Result<T, C>;
