use super::{ConnectivityCheckRecord, OutageEvent, Sink, SinkError, StatusChangeRecord};
use crate::config::DeviceId;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Writes every record to each inner sink; reads come from the first sink able to answer.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    /// Runs `write` on every sink and returns the first failure after all have been tried.
    fn each(&self, write: impl Fn(&dyn Sink) -> Result<(), SinkError>) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(err) = write(sink.as_ref()) {
                if first_error.is_some() {
                    warn!(sink = sink.name(), error = %err, "additional sink write failed");
                } else {
                    first_error = Some(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Sink for FanoutSink {
    fn name(&self) -> &'static str {
        "fanout"
    }

    fn record_check(&self, record: &ConnectivityCheckRecord) -> Result<(), SinkError> {
        self.each(|sink| sink.record_check(record))
    }

    fn record_status_change(&self, change: &StatusChangeRecord) -> Result<(), SinkError> {
        self.each(|sink| sink.record_status_change(change))
    }

    fn record_outage_start(&self, device_id: DeviceId, at: DateTime<Utc>) -> Result<(), SinkError> {
        self.each(|sink| sink.record_outage_start(device_id, at))
    }

    fn record_outage_end(
        &self,
        device_id: DeviceId,
        duration: Duration,
        at: DateTime<Utc>,
    ) -> Result<(), SinkError> {
        self.each(|sink| sink.record_outage_end(device_id, duration, at))
    }

    fn query_outages(&self, since: DateTime<Utc>) -> Result<Vec<OutageEvent>, SinkError> {
        for sink in &self.sinks {
            match sink.query_outages(since) {
                Err(SinkError::Unsupported { .. }) => continue,
                other => return other,
            }
        }
        Err(SinkError::Unsupported {
            sink: "fanout",
            operation: "query_outages",
        })
    }
}
