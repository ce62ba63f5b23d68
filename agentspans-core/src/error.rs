//! Error types for agentspans-core

use thiserror::Error;

/// Main error type for the agentspans-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error (opening a stream, reading config)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Stream discovery error (bad root, invalid glob pattern)
    #[error("discovery error: {0}")]
    Discovery(String),

    /// Worker runtime error
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Result type alias for agentspans-core
pub type Result<T> = std::result::Result<T, Error>;
