use crate::common::time::{Clock, ago};
use crate::config::HistoryWindow;
use crate::monitor::DeviceSnapshot;
use crate::registry::DeviceRegistry;
use crate::storage::{OutageEvent, Sink};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Shared by every live view handler.
#[derive(Clone)]
pub struct LiveViewState {
    pub registry: Arc<DeviceRegistry>,
    pub sink: Arc<dyn Sink>,
    pub clock: Arc<dyn Clock>,
    pub push_interval: Duration,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OutageWindows {
    pub day: Vec<OutageEvent>,
    pub week: Vec<OutageEvent>,
    pub month: Vec<OutageEvent>,
}

/// One message pushed to live view clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LiveSnapshot {
    pub generated_at: DateTime<Utc>,
    pub devices: Vec<DeviceSnapshot>,
    pub outages: OutageWindows,
}

/// Blocks on storage; call from a blocking context.
pub fn build_snapshot(state: &LiveViewState) -> LiveSnapshot {
    let now = state.clock.now();
    let sink = state.sink.as_ref();
    LiveSnapshot {
        generated_at: now,
        devices: state.registry.snapshot(),
        outages: OutageWindows {
            day: outages_in(sink, now, HistoryWindow::Day),
            week: outages_in(sink, now, HistoryWindow::Week),
            month: outages_in(sink, now, HistoryWindow::Month),
        },
    }
}

fn outages_in(sink: &dyn Sink, now: DateTime<Utc>, window: HistoryWindow) -> Vec<OutageEvent> {
    sink.query_outages(ago(now, window.duration()))
        .unwrap_or_else(|err| {
            warn!(window = %window, sink = sink.name(), error = %err, "outage query failed");
            Vec::new()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::time::ManualClock;
    use crate::config::DeviceId;
    use crate::storage::{LogFileSink, MemorySink};

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp")
    }

    fn state(sink: Arc<dyn Sink>) -> LiveViewState {
        LiveViewState {
            registry: Arc::new(DeviceRegistry::new()),
            sink,
            clock: Arc::new(ManualClock::new(start())),
            push_interval: Duration::from_secs(1),
        }
    }

    #[test]
    fn windows_include_only_outages_started_inside_them() {
        let sink = Arc::new(MemorySink::new());
        let device = DeviceId::from_u128(1);
        for hours_ago in [40 * 24, 20 * 24, 3 * 24, 2] {
            let at = start() - chrono::Duration::hours(hours_ago);
            sink.record_outage_start(device, at).expect("start");
            sink.record_outage_end(device, Duration::from_secs(60), at + chrono::Duration::minutes(1))
                .expect("end");
        }

        let snapshot = build_snapshot(&state(sink));
        assert_eq!(snapshot.generated_at, start());
        assert_eq!(snapshot.outages.day.len(), 1);
        assert_eq!(snapshot.outages.week.len(), 2);
        assert_eq!(snapshot.outages.month.len(), 3);
        assert!(snapshot.outages.month.windows(2).all(|w| w[0].start <= w[1].start));
    }

    #[test]
    fn failing_queries_produce_empty_windows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = Arc::new(LogFileSink::open(&dir.path().join("linkpulse.log")).expect("log"));
        let snapshot = build_snapshot(&state(sink));
        assert_eq!(snapshot.outages, OutageWindows::default());
        assert!(snapshot.devices.is_empty());
    }

    #[test]
    fn snapshot_serializes_window_keys() {
        let snapshot = build_snapshot(&state(Arc::new(MemorySink::new())));
        let json = serde_json::to_value(&snapshot).expect("json");
        assert!(json["outages"]["day"].is_array());
        assert!(json["outages"]["week"].is_array());
        assert!(json["outages"]["month"].is_array());
        assert!(json["devices"].is_array());
    }
}
