use core::fmt;

/// Collapses every failure `robot-ctl` can hit into the two outcomes that
/// matter at the process boundary: a bad topology/argument (exit non-zero
/// before anything runs) or a runtime failure after workers started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Runtime,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => fmt.write_str("robot-ctl could not build the topology"),
            Self::Runtime => fmt.write_str("robot-ctl failed while running"),
        }
    }
}

impl error_stack::Context for ErrorKind {}

pub type Result<T, C = ErrorKind> = error_stack::Result<T, C>;
