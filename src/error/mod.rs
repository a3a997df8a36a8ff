//! Error handling for the daemon
//!
//! One error type covers every layer: identity generation, the account store,
//! the network loop and configuration loading.

use std::fmt;

/// Result type alias for daemon operations
pub type Result<T> = std::result::Result<T, PhantomError>;

/// Error types for daemon operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhantomError {
    /// The account store has no free slot left
    StoreFull { capacity: usize },
    /// Randomness or digest failures
    Crypto(String),
    /// Socket, poll and listener errors
    Network(String),
    /// Invalid or unreadable configuration
    Config(String),
    /// A mutex was poisoned by a panicking holder
    Lock(String),
    /// File I/O errors
    Io(String),
}

impl fmt::Display for PhantomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhantomError::StoreFull { capacity } => {
                write!(f, "Account store is full ({capacity} accounts)")
            }
            PhantomError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            PhantomError::Network(msg) => write!(f, "Network error: {msg}"),
            PhantomError::Config(msg) => write!(f, "Configuration error: {msg}"),
            PhantomError::Lock(msg) => write!(f, "Lock error: {msg}"),
            PhantomError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for PhantomError {}

impl From<std::io::Error> for PhantomError {
    fn from(err: std::io::Error) -> Self {
        PhantomError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for PhantomError {
    fn from(err: toml::de::Error) -> Self {
        PhantomError::Config(err.to_string())
    }
}
