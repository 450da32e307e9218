use thiserror::Error;

/// Errors raised by the media catalog
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("catalog query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("record {id} has an invalid timestamp ({micros}us)")]
    InvalidTimestamp { id: String, micros: i64 },

    #[error("catalog worker stopped: {0}")]
    Worker(String),

    #[error("catalog directory unavailable: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
