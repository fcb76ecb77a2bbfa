//! Error types for GalacticCIC

use std::path::PathBuf;

/// GalacticCIC error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Db(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Config directory could not be created: {0}")]
    ConfigDir(PathBuf),

    #[error("Collector daemon is not running")]
    DaemonNotRunning,

    #[error("Service operation failed: {0}")]
    Service(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for GalacticCIC
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn db<S: Into<String>>(msg: S) -> Self {
        Error::Db(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn service<S: Into<String>>(msg: S) -> Self {
        Error::Service(msg.into())
    }

    pub fn http<S: Into<String>>(msg: S) -> Self {
        Error::Http(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Db("disk full".to_string());
        assert_eq!(err.to_string(), "Database error: disk full");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
