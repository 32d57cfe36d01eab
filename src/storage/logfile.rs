use super::{ConnectivityCheckRecord, OutageEvent, Sink, SinkError, StatusChangeRecord};
use crate::config::DeviceId;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Append-only, human-readable event log.
pub struct LogFileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl LogFileSink {
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: String) -> Result<(), SinkError> {
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(file, "{line}")?;
        Ok(())
    }
}

fn stamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(super) fn format_check(record: &ConnectivityCheckRecord) -> String {
    let seconds = record.latency.as_secs_f64();
    if record.success {
        format!(
            "[{}] DEVICE: {} CONNECTED IN {seconds:.2} SECONDS",
            stamp(record.timestamp),
            record.device_id
        )
    } else {
        format!(
            "[{}] DEVICE: {} FAILED TO CONNECT IN {seconds:.2} SECONDS, ERROR: {}",
            stamp(record.timestamp),
            record.device_id,
            record.error.as_deref().unwrap_or("unknown")
        )
    }
}

impl Sink for LogFileSink {
    fn name(&self) -> &'static str {
        "logfile"
    }

    fn record_check(&self, record: &ConnectivityCheckRecord) -> Result<(), SinkError> {
        self.append(format_check(record))
    }

    fn record_status_change(&self, change: &StatusChangeRecord) -> Result<(), SinkError> {
        self.append(format!(
            "[{}] DEVICE: {} STATUS CHANGE: {} -> {}",
            stamp(change.timestamp),
            change.device_id,
            change.from,
            change.to
        ))
    }

    fn record_outage_start(&self, device_id: DeviceId, at: DateTime<Utc>) -> Result<(), SinkError> {
        self.append(format!("[{}] DEVICE: {device_id} OUTAGE START", stamp(at)))
    }

    fn record_outage_end(
        &self,
        device_id: DeviceId,
        duration: Duration,
        at: DateTime<Utc>,
    ) -> Result<(), SinkError> {
        self.append(format!(
            "[{}] DEVICE: {device_id} OUTAGE END: LASTED {:.0} SECONDS",
            stamp(at),
            duration.as_secs_f64()
        ))
    }

    fn query_outages(&self, _since: DateTime<Utc>) -> Result<Vec<OutageEvent>, SinkError> {
        Err(SinkError::Unsupported {
            sink: "logfile",
            operation: "query_outages",
        })
    }
}
