use core::fmt;

/// Dispatcher-level error taxonomy, covering the "Configuration error" and
/// "Worker exception" cases; everything else (Transport, RPC overflow,
/// Backpressure, Log buffer overflow) is handled *inside* a worker or the
/// log pipeline and never escapes as a `dispatcher::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Mismatched topology: empty `processes`, a requested worker missing
    /// from the topology, a `consume` queue with no publisher, an unknown
    /// shared-object tag, or an `add_process`/`add_shared_object` name
    /// collision.
    Configuration,
    /// A queue or shared-state broker could not be declared/started.
    BrokerStart,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => fmt.write_str("dispatcher topology is misconfigured"),
            Self::BrokerStart => fmt.write_str("could not start a broker"),
        }
    }
}

impl error_stack::Context for ErrorKind {}

pub type Result<T, C = ErrorKind> = error_stack::Result<T, C>;
