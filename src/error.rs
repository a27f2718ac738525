//! Error types for the rehearsal partner

use thiserror::Error;

/// Result type alias for rehearsal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or playing a scene
#[derive(Debug, Error)]
pub enum Error {
    /// Script input lacks the required structure
    #[error("malformed script: {0}")]
    MalformedScript(String),

    /// Script file type is not understood
    #[error("unsupported script format: {0}")]
    UnsupportedFormat(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or codec error
    #[error("audio error: {0}")]
    Audio(String),

    /// Text-to-speech error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Speech-to-text error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
