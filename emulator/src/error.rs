//! Error types for the emulator

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Value outside the range the controller accepts
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Command-line usage error
    #[error("{0}")]
    Usage(String),
}
