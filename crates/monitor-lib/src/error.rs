//! Error types shared across the monitor

use std::io;
use thiserror::Error;

/// Failure of a single host query
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ProbeError {
    /// True for failures worth a second attempt against another mount
    pub fn is_access_failure(&self) -> bool {
        matches!(
            self,
            ProbeError::PermissionDenied(_) | ProbeError::NotFound(_) | ProbeError::Io(_)
        )
    }
}

/// A collector failed outside its own degrade-to-sentinel handling
#[derive(Debug, Clone, Error)]
pub enum CollectError {
    #[error("{collector} collector panicked: {message}")]
    Panicked {
        collector: &'static str,
        message: String,
    },

    #[error("{collector} collector was cancelled")]
    Cancelled { collector: &'static str },
}

impl CollectError {
    pub fn from_join(collector: &'static str, err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            return CollectError::Cancelled { collector };
        }
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        CollectError::Panicked { collector, message }
    }
}

/// Any failure the monitor reports to a caller
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("system failure: {0}")]
    System(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error("{0}")]
    Other(String),
}

impl MonitorError {
    /// Stable name of the failure kind, used in error reports
    pub fn kind_name(&self) -> &'static str {
        match self {
            MonitorError::Io(_) => "IoError",
            MonitorError::System(_) => "SystemError",
            MonitorError::Connection(_) => "ConnectionError",
            MonitorError::Timeout(_) => "TimeoutError",
            MonitorError::InvalidValue(_) => "ValueError",
            MonitorError::TypeMismatch(_) => "TypeError",
            MonitorError::PermissionDenied(_) => "PermissionError",
            MonitorError::NotFound(_) => "NotFoundError",
            MonitorError::Probe(ProbeError::PermissionDenied(_)) => "PermissionError",
            MonitorError::Probe(ProbeError::NotFound(_)) => "NotFoundError",
            MonitorError::Probe(ProbeError::Unavailable(_)) => "SystemError",
            MonitorError::Probe(ProbeError::Io(_)) => "IoError",
            MonitorError::Collect(_) => "CollectorError",
            MonitorError::Other(_) => "Error",
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::InvalidValue(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_error_captures_panic_message() {
        let handle = tokio::task::spawn_blocking(|| -> u32 { panic!("probe exploded") });
        let err = handle.await.unwrap_err();
        let err = CollectError::from_join("cpu", err);

        match err {
            CollectError::Panicked { collector, message } => {
                assert_eq!(collector, "cpu");
                assert_eq!(message, "probe exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(
            MonitorError::InvalidValue("x".into()).kind_name(),
            "ValueError"
        );
        assert_eq!(
            MonitorError::Probe(ProbeError::NotFound("/".into())).kind_name(),
            "NotFoundError"
        );
    }

    #[test]
    fn test_access_failures() {
        assert!(ProbeError::PermissionDenied("/".into()).is_access_failure());
        assert!(!ProbeError::Unavailable("cpu".into()).is_access_failure());
    }
}
