use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `client_process` was empty (`Request` requires at least one character).
    InvalidField,
    /// BSON encoding failed.
    Encode,
    /// BSON decoding failed, or the decoded document was missing a required key.
    Decode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidField => fmt.write_str("invalid field value"),
            Self::Encode => fmt.write_str("could not encode value as BSON"),
            Self::Decode => fmt.write_str("could not decode BSON value"),
        }
    }
}

impl error_stack::Context for ErrorKind {}

pub type Result<T, C = ErrorKind> = error_stack::Result<T, C>;
