mod fanout;
mod logfile;
mod memory;
mod sqlite;

pub use fanout::FanoutSink;
pub use logfile::LogFileSink;
pub use memory::MemorySink;
pub use sqlite::SqliteSink;

use crate::common::time::serialize_opt_duration_ms;
use crate::config::{DeviceId, StorageConfig};
use crate::monitor::ConnectionStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("log file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{operation} is not supported by the {sink} sink")]
    Unsupported {
        sink: &'static str,
        operation: &'static str,
    },
    #[error("device {0} has no open outage")]
    NoOpenOutage(DeviceId),
    #[error("device {0} already has an open outage")]
    OutageAlreadyOpen(DeviceId),
}

/// One probe round as persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectivityCheckRecord {
    pub device_id: DeviceId,
    pub success: bool,
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatusChangeRecord {
    pub device_id: DeviceId,
    pub from: ConnectionStatus,
    pub to: ConnectionStatus,
    pub timestamp: DateTime<Utc>,
}

/// Outage span; `end` and `duration` stay empty while the outage is open.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutageEvent {
    pub device_id: DeviceId,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_opt_duration_ms")]
    pub duration: Option<Duration>,
}

impl OutageEvent {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// Durable record of everything a monitor observes.
///
/// Implementations are shared between monitors and the live view, so every
/// method takes `&self` and must tolerate concurrent callers.
pub trait Sink: Send + Sync {
    fn name(&self) -> &'static str;

    fn record_check(&self, record: &ConnectivityCheckRecord) -> Result<(), SinkError>;

    fn record_status_change(&self, change: &StatusChangeRecord) -> Result<(), SinkError>;

    fn record_outage_start(&self, device_id: DeviceId, at: DateTime<Utc>) -> Result<(), SinkError>;

    /// Closes the device's open outage.
    fn record_outage_end(
        &self,
        device_id: DeviceId,
        duration: Duration,
        at: DateTime<Utc>,
    ) -> Result<(), SinkError>;

    /// Outages that started at or after `since`, oldest first.
    fn query_outages(&self, since: DateTime<Utc>) -> Result<Vec<OutageEvent>, SinkError>;
}

pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("linkpulse").join("linkpulse.db"))
}

/// Opens every sink the configuration asks for.
pub fn open(config: &StorageConfig) -> Result<Arc<dyn Sink>, SinkError> {
    let primary: Arc<dyn Sink> = match &config.db_path {
        Some(path) => Arc::new(SqliteSink::open(path)?),
        None => Arc::new(MemorySink::new()),
    };

    match &config.log_file {
        Some(path) => {
            let log: Arc<dyn Sink> = Arc::new(LogFileSink::open(path)?);
            Ok(Arc::new(FanoutSink::new(vec![primary, log])))
        }
        None => Ok(primary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_db_path_ends_with_crate_dir() {
        if let Some(path) = default_db_path() {
            assert!(path.ends_with("linkpulse/linkpulse.db"));
        }
    }

    #[test]
    fn open_without_db_keeps_records_in_memory() {
        let sink = open(&StorageConfig {
            db_path: None,
            log_file: None,
        })
        .expect("sink");
        assert_eq!(sink.name(), "memory");
    }

    #[test]
    fn open_with_log_file_fans_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = open(&StorageConfig {
            db_path: Some(dir.path().join("data").join("linkpulse.db")),
            log_file: Some(dir.path().join("logs").join("linkpulse.log")),
        })
        .expect("sink");
        assert_eq!(sink.name(), "fanout");
        assert!(dir.path().join("logs").join("linkpulse.log").exists());
        assert!(sink.query_outages(DateTime::<Utc>::MIN_UTC).expect("query").is_empty());
    }

    #[test]
    fn outage_event_serializes_duration_in_millis() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp");
        let event = OutageEvent {
            device_id: DeviceId::nil(),
            start,
            end: Some(start + chrono::Duration::seconds(3)),
            duration: Some(Duration::from_secs(3)),
        };
        let json = serde_json::to_value(&event).expect("json");
        assert_eq!(json["duration_ms"], 3000);
        assert!(!event.is_open());

        let open = OutageEvent {
            end: None,
            duration: None,
            ..event
        };
        let json = serde_json::to_value(&open).expect("json");
        assert!(json["duration_ms"].is_null());
        assert!(open.is_open());
    }
}
