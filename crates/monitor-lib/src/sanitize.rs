//! Output sanitization
//!
//! Samples leave the process only after their `mountpoint` and `error`
//! fields have been rewritten so they no longer leak local paths.
//! The rules are a fixed field filter, not a general PII scrubber.

use crate::models::{CpuSample, DiskSample, MemorySample, NetworkSample};
use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::OnceLock;

const REDACTED: &str = "***REDACTED***";

/// Keep only the drive letter of a Windows path, or the root of a POSIX one
pub fn redact_mountpoint(mountpoint: &str) -> String {
    match mountpoint.split_once(':') {
        Some((drive, _)) if drive.len() == 1 && drive.chars().all(|c| c.is_ascii_alphabetic()) => {
            format!("{drive}:\\")
        }
        _ => "/".to_string(),
    }
}

/// Normalise separators and hide the system drive in an error message
pub fn redact_error(message: &str) -> String {
    message.replace('\\', "/").replace("C:/", "***/")
}

/// Apply the field rules to the top level of a flat JSON object
pub fn sanitize_fields(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| {
            let value = match (key.as_str(), value) {
                ("mountpoint", Value::String(s)) => Value::String(redact_mountpoint(&s)),
                ("error", Value::String(s)) => Value::String(redact_error(&s)),
                (_, other) => other,
            };
            (key, value)
        })
        .collect()
}

/// Apply the field rules to any JSON value; non-objects pass through
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(sanitize_fields(fields)),
        other => other,
    }
}

/// Samples that can be made safe to publish
pub trait Sanitize {
    fn sanitized(self) -> Self;
}

impl Sanitize for CpuSample {
    fn sanitized(mut self) -> Self {
        self.error = self.error.as_deref().map(redact_error);
        self
    }
}

impl Sanitize for MemorySample {
    fn sanitized(mut self) -> Self {
        self.error = self.error.as_deref().map(redact_error);
        self
    }
}

impl Sanitize for DiskSample {
    fn sanitized(mut self) -> Self {
        self.mountpoint = self.mountpoint.as_deref().map(redact_mountpoint);
        self.error = self.error.as_deref().map(redact_error);
        self
    }
}

impl Sanitize for NetworkSample {
    fn sanitized(mut self) -> Self {
        self.error = self.error.as_deref().map(redact_error);
        self
    }
}

fn secret_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        ["password", "token", "secret"]
            .iter()
            .filter_map(|word| {
                Regex::new(&format!(r#"(?i){word}["']?\s*[:=]\s*["']?[^"']+["']?"#)).ok()
            })
            .collect()
    })
}

/// Mask credential assignments before a message is written to the log
pub fn redact_secrets(message: &str) -> Cow<'_, str> {
    let mut result = Cow::Borrowed(message);
    for pattern in secret_patterns() {
        if pattern.is_match(&result) {
            result = Cow::Owned(pattern.replace_all(&result, REDACTED).into_owned());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sanitize_json(value: Value) -> Value {
        sanitize_value(value)
    }

    #[test]
    fn test_windows_mountpoint_keeps_drive_letter() {
        let out = sanitize_json(json!({"mountpoint": "C:\\Users\\x"}));
        assert_eq!(out["mountpoint"], "C:\\");
    }

    #[test]
    fn test_posix_mountpoint_becomes_root() {
        let out = sanitize_json(json!({"mountpoint": "/home/x"}));
        assert_eq!(out["mountpoint"], "/");
    }

    #[test]
    fn test_posix_mountpoint_with_colon_becomes_root() {
        assert_eq!(redact_mountpoint("/mnt/a:b"), "/");
        assert_eq!(redact_mountpoint("data:archive"), "/");
        assert_eq!(redact_mountpoint("d:\\backup"), "d:\\");
    }

    #[test]
    fn test_error_hides_system_drive() {
        let out = sanitize_json(json!({"error": "fail at C:/secret/path"}));
        assert_eq!(out["error"], "fail at ***/secret/path");

        let out = sanitize_json(json!({"error": "fail at C:\\secret\\path"}));
        assert_eq!(out["error"], "fail at ***/secret/path");
    }

    #[test]
    fn test_other_fields_untouched() {
        let input = json!({"usage": 12.5, "path": "C:\\x", "nested": {"mountpoint": "/a"}});
        assert_eq!(sanitize_json(input.clone()), input);
    }

    #[test]
    fn test_non_string_fields_untouched() {
        let input = json!({"mountpoint": 3, "error": null});
        assert_eq!(sanitize_json(input.clone()), input);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            json!({"mountpoint": "D:\\data\\x", "error": "C:\\a\\b"}),
            json!({"mountpoint": "/var/lib", "error": "no such file /var/lib"}),
            json!({"mountpoint": "C:\\", "error": "***/x"}),
            json!({"usage": -1, "error": "C:/C:/x"}),
        ];
        for input in inputs {
            let once = sanitize_json(input);
            let twice = sanitize_json(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_typed_disk_sample() {
        let sample = DiskSample {
            usage: 40.0,
            total: 100,
            used: 40,
            free: 60,
            mountpoint: Some("/mnt/secret".to_string()),
            timestamp: 0.0,
            error: None,
        };
        let sanitized = sample.sanitized();
        assert_eq!(sanitized.mountpoint.as_deref(), Some("/"));
        assert_eq!(sanitized.clone().sanitized(), sanitized);
    }

    #[test]
    fn test_redact_secrets() {
        assert_eq!(
            redact_secrets("login failed password=hunter2"),
            "login failed ***REDACTED***"
        );
        assert_eq!(redact_secrets("TOKEN: abc"), "***REDACTED***");
        assert!(matches!(redact_secrets("all clear"), Cow::Borrowed(_)));
    }
}
