use super::{ConnectivityCheckRecord, OutageEvent, Sink, SinkError, StatusChangeRecord};
use crate::config::DeviceId;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct Records {
    checks: Vec<ConnectivityCheckRecord>,
    status_changes: Vec<StatusChangeRecord>,
    outages: Vec<OutageEvent>,
}

/// Process-local sink; nothing survives a restart.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Records>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, Records> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn checks(&self) -> Vec<ConnectivityCheckRecord> {
        self.records().checks.clone()
    }

    pub fn status_changes(&self) -> Vec<StatusChangeRecord> {
        self.records().status_changes.clone()
    }

    pub fn outages(&self) -> Vec<OutageEvent> {
        self.records().outages.clone()
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn record_check(&self, record: &ConnectivityCheckRecord) -> Result<(), SinkError> {
        self.records().checks.push(record.clone());
        Ok(())
    }

    fn record_status_change(&self, change: &StatusChangeRecord) -> Result<(), SinkError> {
        self.records().status_changes.push(change.clone());
        Ok(())
    }

    fn record_outage_start(&self, device_id: DeviceId, at: DateTime<Utc>) -> Result<(), SinkError> {
        let mut records = self.records();
        if records
            .outages
            .iter()
            .any(|o| o.device_id == device_id && o.is_open())
        {
            return Err(SinkError::OutageAlreadyOpen(device_id));
        }
        records.outages.push(OutageEvent {
            device_id,
            start: at,
            end: None,
            duration: None,
        });
        Ok(())
    }

    fn record_outage_end(
        &self,
        device_id: DeviceId,
        duration: Duration,
        at: DateTime<Utc>,
    ) -> Result<(), SinkError> {
        let mut records = self.records();
        let open = records
            .outages
            .iter_mut()
            .rev()
            .find(|o| o.device_id == device_id && o.is_open())
            .ok_or(SinkError::NoOpenOutage(device_id))?;
        open.end = Some(at);
        open.duration = Some(duration);
        Ok(())
    }

    fn query_outages(&self, since: DateTime<Utc>) -> Result<Vec<OutageEvent>, SinkError> {
        let mut outages: Vec<OutageEvent> = self
            .records()
            .outages
            .iter()
            .filter(|o| o.start >= since)
            .cloned()
            .collect();
        outages.sort_by_key(|o| o.start);
        Ok(outages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn base() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp")
    }

    #[test]
    fn enforces_one_open_outage_per_device() {
        let sink = MemorySink::new();
        let device = DeviceId::new_v4();
        sink.record_outage_start(device, base()).expect("start");
        assert!(matches!(
            sink.record_outage_start(device, base()),
            Err(SinkError::OutageAlreadyOpen(_))
        ));
        sink.record_outage_end(device, Duration::from_secs(2), base() + ChronoDuration::seconds(2))
            .expect("end");
        sink.record_outage_start(device, base() + ChronoDuration::seconds(5))
            .expect("restart");
        assert_eq!(sink.outages().len(), 2);
    }

    #[test]
    fn end_without_open_outage_errors() {
        let sink = MemorySink::new();
        assert!(matches!(
            sink.record_outage_end(DeviceId::new_v4(), Duration::ZERO, base()),
            Err(SinkError::NoOpenOutage(_))
        ));
    }

    #[test]
    fn query_filters_and_sorts_by_start() {
        let sink = MemorySink::new();
        let now = base();
        let a = DeviceId::new_v4();
        let b = DeviceId::new_v4();
        sink.record_outage_start(a, now - ChronoDuration::hours(2)).expect("a");
        sink.record_outage_start(b, now - ChronoDuration::hours(30)).expect("b");
        sink.record_outage_end(a, Duration::from_secs(60), now - ChronoDuration::hours(1))
            .expect("end a");

        let day = sink.query_outages(now - ChronoDuration::days(1)).expect("query");
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].device_id, a);

        let week = sink.query_outages(now - ChronoDuration::days(7)).expect("query");
        assert_eq!(week.iter().map(|o| o.device_id).collect::<Vec<_>>(), vec![b, a]);
        assert!(week[0].is_open());
        assert_eq!(week[1].duration, Some(Duration::from_secs(60)));
    }
}
