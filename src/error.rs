use std::{fmt, io};

/// Result type shared across the pipeline.
pub type LogResult<T> = Result<T, LogError>;

/// Errors surfaced by the pipeline.
///
/// None of these are returned from [`Logger::log`](crate::Logger::log); they
/// reach the configured error handler and the metrics observer instead.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The async queue was full and a record was dropped.
    #[error("async queue full, dropping log entry")]
    QueueFull,
    /// The sink rejected a write. The record is lost.
    #[error("sink write failed: {0}")]
    Write(#[source] io::Error),
    /// A value could not be encoded.
    #[error("render failed: {0}")]
    Render(String),
    /// Encoding or writing panicked; the payload message is kept.
    #[error("panic during log formatting: {0}")]
    Panicked(String),
    /// The background writer thread could not be started.
    #[error("failed to spawn writer thread: {0}")]
    Spawn(#[source] io::Error),
}

impl From<fmt::Error> for LogError {
    fn from(_: fmt::Error) -> Self {
        LogError::Render("a Display implementation returned an error".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_error_becomes_render() {
        let err: LogError = fmt::Error.into();
        assert!(matches!(err, LogError::Render(msg) if msg.contains("Display")));
    }

    #[test]
    fn queue_full_message_is_stable() {
        assert_eq!(
            LogError::QueueFull.to_string(),
            "async queue full, dropping log entry"
        );
    }
}
