//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while locating or tailing log files.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// Watched file could not be opened (deleted or rotated away).
    #[error("Log file not found: {0}")]
    FileNotFound(PathBuf),

    /// Permission denied accessing file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Invalid extraction pattern.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_display() {
        let err = WatcherError::FileNotFound(PathBuf::from("/tmp/output_log_x.txt"));
        assert_eq!(err.to_string(), "Log file not found: /tmp/output_log_x.txt");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: WatcherError = io_err.into();
        assert!(matches!(err, WatcherError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_from_notify_error() {
        let err: WatcherError = notify::Error::generic("test error").into();
        assert!(matches!(err, WatcherError::Notify(_)));
        assert!(err.to_string().contains("File watcher error"));
    }
}
