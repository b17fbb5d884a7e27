//! Error classification into severity tiers
//!
//! Every failure that reaches a caller is turned into an [`ErrorReport`]:
//! a severity tier derived from the failure kind, a short correlation code
//! derived from the message, and the caller's context. The report is
//! written to the log before it is returned.

use crate::error::{MonitorError, ProbeError};
use crate::observability::MonitorMetrics;
use crate::sanitize::{redact_secrets, sanitize_fields};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::io;
use tracing::{error, warn};

/// Severity tiers, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// System-level I/O failures
    Critical,
    /// Network and timeout failures
    Connectivity,
    /// Invalid values or types
    Data,
    /// Permission and not-found failures
    Permission,
    Minor,
}

impl Severity {
    /// DEFCON label, 1 for critical through 5 for minor
    pub fn defcon_level(&self) -> &'static str {
        match self {
            Severity::Critical => "DEFCON-1",
            Severity::Connectivity => "DEFCON-2",
            Severity::Data => "DEFCON-3",
            Severity::Permission => "DEFCON-4",
            Severity::Minor => "DEFCON-5",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Severity::Critical => "Maximum readiness",
            Severity::Connectivity => "Armed forces ready to deploy",
            Severity::Data => "Ready to mobilize",
            Severity::Permission => "Above normal readiness",
            Severity::Minor => "Normal readiness",
        }
    }

    pub fn alert(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL SYSTEM FAILURE - IMMEDIATE ACTION REQUIRED",
            Severity::Connectivity => "SYSTEM DEGRADED - HIGH PRIORITY ATTENTION NEEDED",
            Severity::Data => "SYSTEM WARNING - MONITORING REQUIRED",
            Severity::Permission => "MINOR ISSUE DETECTED - STANDARD MONITORING",
            Severity::Minor => "NORMAL OPERATION - NO ACTION REQUIRED",
        }
    }

    /// HTTP status code used when the failure ends a request
    pub fn status_code(&self) -> u16 {
        match self {
            Severity::Critical => 500,
            Severity::Connectivity => 503,
            Severity::Data => 400,
            Severity::Permission => 403,
            Severity::Minor => 200,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Connectivity => write!(f, "connectivity"),
            Severity::Data => write!(f, "data"),
            Severity::Permission => write!(f, "permission"),
            Severity::Minor => write!(f, "minor"),
        }
    }
}

/// Structured description of a failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub timestamp: String,
    pub error_type: String,
    pub message: String,
    pub severity: Severity,
    pub context: Map<String, Value>,
    pub code: String,
    pub request_id: String,
}

impl ErrorReport {
    /// Code as written in logs and responses
    pub fn military_code(&self) -> String {
        format!("ERR-{}", self.code)
    }

    /// Body of the `MISSION_FAILED` response envelope
    pub fn to_response_body(&self) -> Value {
        json!({
            "status": "MISSION_FAILED",
            "defcon_level": self.severity.defcon_level(),
            "military_code": self.military_code(),
            "error": {
                "type": self.error_type,
                "message": self.message,
                "context": self.context,
            },
            "timestamp": self.timestamp,
            "request_id": self.request_id,
            "alert": self.severity.alert(),
        })
    }
}

fn classify_io(kind: io::ErrorKind) -> Severity {
    use io::ErrorKind::*;
    match kind {
        PermissionDenied | NotFound => Severity::Permission,
        TimedOut | ConnectionRefused | ConnectionReset | ConnectionAborted | NotConnected
        | AddrInUse | AddrNotAvailable | BrokenPipe => Severity::Connectivity,
        InvalidInput | InvalidData | UnexpectedEof => Severity::Data,
        _ => Severity::Critical,
    }
}

/// Severity tier of a failure
pub fn severity_of(err: &MonitorError) -> Severity {
    match err {
        MonitorError::Io(e) | MonitorError::Probe(ProbeError::Io(e)) => classify_io(e.kind()),
        MonitorError::System(_) | MonitorError::Probe(ProbeError::Unavailable(_)) => {
            Severity::Critical
        }
        MonitorError::Collect(_) => Severity::Critical,
        MonitorError::Connection(_) | MonitorError::Timeout(_) => Severity::Connectivity,
        MonitorError::InvalidValue(_) | MonitorError::TypeMismatch(_) => Severity::Data,
        MonitorError::PermissionDenied(_)
        | MonitorError::NotFound(_)
        | MonitorError::Probe(ProbeError::PermissionDenied(_))
        | MonitorError::Probe(ProbeError::NotFound(_)) => Severity::Permission,
        MonitorError::Other(_) => Severity::Minor,
    }
}

/// Eight uppercase hex digits derived from the message
pub fn error_code(message: &str) -> String {
    let digest = Md5::digest(message.as_bytes());
    hex::encode_upper(&digest[..4])
}

/// Classify a failure, log it, and build its report
pub fn classify_error(
    err: &MonitorError,
    context: Map<String, Value>,
    request_id: &str,
) -> ErrorReport {
    let message = err.to_string();
    let severity = severity_of(err);
    let report = ErrorReport {
        timestamp: chrono::Utc::now().to_rfc3339(),
        error_type: err.kind_name().to_string(),
        code: error_code(&message),
        message: message.clone(),
        severity,
        context: sanitize_fields(context),
        request_id: request_id.to_string(),
    };

    log_report(&report);
    MonitorMetrics::new().inc_error_reports(&severity.to_string());
    report
}

fn log_report(report: &ErrorReport) {
    let message = redact_secrets(&report.message);
    let context = Value::Object(report.context.clone());
    match report.severity {
        Severity::Critical | Severity::Connectivity | Severity::Data => error!(
            event = "error_report",
            defcon_level = report.severity.defcon_level(),
            readiness = report.severity.description(),
            military_code = %report.military_code(),
            error_type = %report.error_type,
            message = %message,
            request_id = %report.request_id,
            context = %context,
            "Mission error report"
        ),
        Severity::Permission | Severity::Minor => warn!(
            event = "error_report",
            defcon_level = report.severity.defcon_level(),
            readiness = report.severity.description(),
            military_code = %report.military_code(),
            error_type = %report.error_type,
            message = %message,
            request_id = %report.request_id,
            context = %context,
            "Mission error report"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectError;

    fn classify(err: MonitorError) -> ErrorReport {
        classify_error(&err, Map::new(), "req-1")
    }

    #[test]
    fn test_data_failures() {
        assert_eq!(
            classify(MonitorError::InvalidValue("usage out of range".into())).severity,
            Severity::Data
        );
        assert_eq!(
            classify(MonitorError::TypeMismatch("expected number".into())).severity,
            Severity::Data
        );
        let json_err = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        assert_eq!(classify(json_err.into()).severity, Severity::Data);
    }

    #[test]
    fn test_permission_failures() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(classify(io_err.into()).severity, Severity::Permission);
        assert_eq!(
            classify(MonitorError::Probe(ProbeError::NotFound("/x".into()))).severity,
            Severity::Permission
        );
    }

    #[test]
    fn test_connectivity_and_critical() {
        let timeout = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert_eq!(classify(timeout.into()).severity, Severity::Connectivity);

        let other = io::Error::new(io::ErrorKind::Other, "disk on fire");
        assert_eq!(classify(other.into()).severity, Severity::Critical);

        let panicked = CollectError::Panicked {
            collector: "cpu",
            message: "oops".into(),
        };
        assert_eq!(classify(panicked.into()).severity, Severity::Critical);
    }

    #[test]
    fn test_minor_is_default() {
        assert_eq!(
            classify(MonitorError::Other("something odd".into())).severity,
            Severity::Minor
        );
    }

    #[test]
    fn test_code_is_stable_and_short() {
        let a = classify(MonitorError::Other("same message".into()));
        let b = classify(MonitorError::Other("same message".into()));
        let c = classify(MonitorError::Other("different".into()));

        assert_eq!(a.code, b.code);
        assert_ne!(a.code, c.code);
        assert_eq!(a.code.len(), 8);
        assert!(a
            .code
            .chars()
            .all(|ch| ch.is_ascii_digit() || ('A'..='F').contains(&ch)));
        assert_eq!(a.military_code(), format!("ERR-{}", a.code));
    }

    #[test]
    fn test_known_md5_prefix() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(error_code(""), "D41D8CD9");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical < Severity::Connectivity);
        assert!(Severity::Permission < Severity::Minor);
    }

    #[test]
    fn test_context_is_sanitized() {
        let mut context = Map::new();
        context.insert("error".into(), Value::String("at C:\\Users\\me".into()));
        context.insert("function".into(), Value::String("stats".into()));
        let report = classify_error(&MonitorError::Other("x".into()), context, "req-2");

        assert_eq!(report.context["error"], "at ***/Users/me");
        assert_eq!(report.context["function"], "stats");
        assert_eq!(report.request_id, "req-2");
    }

    #[test]
    fn test_response_body_shape() {
        let report = classify(MonitorError::Timeout("probe".into()));
        let body = report.to_response_body();

        assert_eq!(body["status"], "MISSION_FAILED");
        assert_eq!(body["defcon_level"], "DEFCON-2");
        assert_eq!(body["error"]["type"], "TimeoutError");
        assert_eq!(body["request_id"], "req-1");
        assert!(body["military_code"].as_str().unwrap().starts_with("ERR-"));
    }
}
