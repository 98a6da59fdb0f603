use std::fmt;
use std::io;

/// Unified error type for ad-gate operations
#[derive(Debug)]
pub enum Error {
    /// I/O error from the settings file
    Io(io::Error),

    /// Settings file failed validation (bad magic, checksum, payload)
    Corrupt(String),

    /// Invalid argument type or value
    InvalidArgument(String),

    /// Daily API quota is used up for the current window
    QuotaExhausted { max: i64, calls: i64 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Corrupt(msg) => write!(f, "Corrupt settings file: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::QuotaExhausted { max, calls } => {
                write!(f, "API quota exhausted: {} of {} calls used", calls, max)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Corrupt(e.to_string())
    }
}

/// Result type alias for ad-gate operations
pub type Result<T> = std::result::Result<T, Error>;
