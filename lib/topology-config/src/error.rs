use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The topology file could not be read from disk.
    Io,
    /// A `${VAR}` token had no matching environment variable and no
    /// `:-default` fallback.
    Substitution,
    /// The (post-substitution) text was not valid topology YAML.
    Parse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => fmt.write_str("could not read topology document"),
            Self::Substitution => fmt.write_str("could not substitute an environment variable"),
            Self::Parse => fmt.write_str("could not parse topology document"),
        }
    }
}

impl error_stack::Context for ErrorKind {}

pub type Result<T, C = ErrorKind> = error_stack::Result<T, C>;
