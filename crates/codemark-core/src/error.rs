//! Error types for codemark.

use thiserror::Error;

/// Top-level result type for codemark operations.
pub type Result<T> = std::result::Result<T, CodemarkError>;

/// Top-level error type for codemark.
#[derive(Debug, Error)]
pub enum CodemarkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("scan error: {0}")]
    Scan(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_human_readable_messages() {
        let err = CodemarkError::Store("missing data directory".to_string());
        assert!(err.to_string().contains("missing data directory"));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CodemarkError::from(io);
        assert!(err.to_string().contains("denied"));
    }
}
