use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A buffer could not be obtained (size overflow or allocator refusal).
    Allocation(String),
    /// An operation's shape preconditions were violated.
    ShapeMismatch(String),
    /// A scalar division by exactly zero was requested.
    DivideByZero,
    /// Features and labels of a batch disagree (sample counts, label values).
    DatasetIntegrity(String),
    InvalidConfig(String),
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Allocation(msg) => write!(f, "allocation failed: {msg}"),
            Error::ShapeMismatch(msg) => write!(f, "shape mismatch: {msg}"),
            Error::DivideByZero => write!(f, "division by zero"),
            Error::DatasetIntegrity(msg) => write!(f, "dataset integrity: {msg}"),
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
