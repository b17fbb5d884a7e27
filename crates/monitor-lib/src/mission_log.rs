//! Bounded in-memory mission log
//!
//! Entries are kept in insertion order; once the log holds
//! [`MISSION_LOG_CAPACITY`] entries the oldest one is evicted on each append.

use crate::observability::MonitorMetrics;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

pub const MISSION_LOG_CAPACITY: usize = 100;

/// One mission log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionLogEntry {
    /// RFC 3339 timestamp
    pub timestamp: String,
    /// Upper-case level, e.g. `INFO`, `WARNING`, `ERROR`
    pub level: String,
    pub message: String,
    pub request_id: String,
}

/// Shared handle to the mission log; clones share the same entries
#[derive(Debug, Clone)]
pub struct MissionLog {
    entries: Arc<RwLock<VecDeque<MissionLogEntry>>>,
    capacity: usize,
    metrics: MonitorMetrics,
}

impl Default for MissionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MissionLog {
    pub fn new() -> Self {
        Self::with_capacity(MISSION_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            metrics: MonitorMetrics::new(),
        }
    }

    /// Append an entry, evicting the oldest one when full
    pub async fn append(
        &self,
        level: &str,
        message: impl Into<String>,
        request_id: &str,
    ) -> MissionLogEntry {
        let entry = MissionLogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: level.trim().to_uppercase(),
            message: message.into(),
            request_id: request_id.to_string(),
        };

        match entry.level.as_str() {
            "ERROR" => error!(request_id = %entry.request_id, "MISSION LOG: {}", entry.message),
            "WARNING" => warn!(request_id = %entry.request_id, "MISSION LOG: {}", entry.message),
            _ => info!(request_id = %entry.request_id, "MISSION LOG: {}", entry.message),
        }

        let len = {
            let mut entries = self.entries.write().await;
            while entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
            entries.len()
        };
        self.metrics.set_mission_log_entries(len as i64);

        entry
    }

    /// Copy of every entry, oldest first
    pub async fn snapshot(&self) -> Vec<MissionLogEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_normalises_level() {
        let log = MissionLog::new();
        let entry = log.append("warning", "fuel low", "req-1").await;

        assert_eq!(entry.level, "WARNING");
        assert_eq!(entry.message, "fuel low");
        assert_eq!(entry.request_id, "req-1");
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest_first() {
        let log = MissionLog::new();
        for i in 1..=101 {
            log.append("INFO", format!("entry {}", i), "req").await;
        }

        let entries = log.snapshot().await;
        assert_eq!(entries.len(), MISSION_LOG_CAPACITY);
        assert_eq!(entries.first().unwrap().message, "entry 2");
        assert_eq!(entries.last().unwrap().message, "entry 101");
        for (offset, entry) in entries.iter().enumerate() {
            assert_eq!(entry.message, format!("entry {}", offset + 2));
        }
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let log = MissionLog::with_capacity(2);
        let other = log.clone();

        log.append("info", "a", "r").await;
        other.append("error", "b", "r").await;
        other.append("info", "c", "r").await;

        let messages: Vec<_> = log
            .snapshot()
            .await
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let log = MissionLog::default();
        assert!(log.is_empty().await);
        assert_eq!(log.capacity(), MISSION_LOG_CAPACITY);
    }
}
