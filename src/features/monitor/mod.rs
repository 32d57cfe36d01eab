mod state;
mod status;

pub use state::{CONNECTION_DOWN, MonitorEvent, MonitorState, OpenOutage};
pub use status::{ConnectionStatus, ParseStatusError};

use crate::alerts::Alerter;
use crate::common::time::{Clock, SystemClock};
use crate::config::{DecisionPolicy, DeviceId, MonitorConfig};
use crate::features::metrics::RoundSummary;
use crate::probe::ProbeRound;
use crate::storage::{ConnectivityCheckRecord, Sink, SinkError, StatusChangeRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Point-in-time view of one monitored device.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub device_id: DeviceId,
    pub status: ConnectionStatus,
    pub latency_ms: f64,
    pub ticks: u64,
    pub outage_started_at: Option<DateTime<Utc>>,
}

/// Connectivity state of one device.
///
/// Probe rounds go in through [`Monitor::observe`]; every resulting check,
/// status change and outage edge is written to the sink once the state lock
/// has been released. Sink failures are logged and never stop monitoring.
pub struct Monitor {
    id: DeviceId,
    interval: Duration,
    policy: DecisionPolicy,
    state: RwLock<MonitorState>,
    sink: Arc<dyn Sink>,
    alerter: Arc<dyn Alerter>,
    clock: Arc<dyn Clock>,
}

impl Monitor {
    pub fn new(config: &MonitorConfig, sink: Arc<dyn Sink>, alerter: Arc<dyn Alerter>) -> Self {
        Self::with_clock(config, sink, alerter, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &MonitorConfig,
        sink: Arc<dyn Sink>,
        alerter: Arc<dyn Alerter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            id: config.device_id,
            interval: config.interval,
            policy: config.policy,
            state: RwLock::new(MonitorState::new()),
            sink,
            alerter,
            clock,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn start(&self) {
        let events = self.write_state().start(self.clock.now());
        if !events.is_empty() {
            info!(device = %self.id, interval_ms = self.interval.as_millis() as u64, "monitor started");
        }
        self.dispatch(&events);
    }

    pub fn stop(&self) {
        let events = self.write_state().stop(self.clock.now());
        if !events.is_empty() {
            info!(device = %self.id, "monitor stopped");
        }
        self.dispatch(&events);
    }

    pub fn is_running(&self) -> bool {
        self.read_state().is_running()
    }

    /// Folds one probe round into the state and returns what it produced.
    pub fn observe(&self, round: &ProbeRound) -> Vec<MonitorEvent> {
        let summary = RoundSummary::from_round(round);
        if let Some(err) = &summary.first_error {
            debug!(
                device = %self.id,
                failures = summary.failures,
                targets = summary.targets,
                error = %err,
                "probe round had failures"
            );
        }

        let now = self.clock.now();
        let events = self.write_state().apply(&summary, &self.policy, now);
        self.dispatch(&events);
        events
    }

    pub fn status(&self) -> ConnectionStatus {
        self.read_state().status()
    }

    pub fn average_latency_ms(&self) -> f64 {
        self.read_state().average_latency_ms()
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        let state = self.read_state();
        DeviceSnapshot {
            device_id: self.id,
            status: state.status(),
            latency_ms: state.average_latency_ms(),
            ticks: state.ticks(),
            outage_started_at: state.open_outage().map(|outage| outage.started_at),
        }
    }

    fn dispatch(&self, events: &[MonitorEvent]) {
        for event in events {
            if let Err(err) = self.record(event) {
                warn!(
                    device = %self.id,
                    sink = self.sink.name(),
                    error = %err,
                    "failed to record monitor event"
                );
            }
            if let MonitorEvent::OutageEnded { duration, .. } = event {
                self.alerter.notify_outage_ended(*duration);
            }
        }
    }

    fn record(&self, event: &MonitorEvent) -> Result<(), SinkError> {
        match event {
            MonitorEvent::Check {
                success,
                latency,
                at,
                error,
            } => self.sink.record_check(&ConnectivityCheckRecord {
                device_id: self.id,
                success: *success,
                latency: *latency,
                timestamp: *at,
                error: error.clone(),
            }),
            MonitorEvent::StatusChange { from, to, at } => {
                info!(device = %self.id, from = %from, to = %to, "connection status changed");
                self.sink.record_status_change(&StatusChangeRecord {
                    device_id: self.id,
                    from: *from,
                    to: *to,
                    timestamp: *at,
                })
            }
            MonitorEvent::OutageStarted { at } => {
                warn!(device = %self.id, started_at = %at, "outage started");
                self.sink.record_outage_start(self.id, *at)
            }
            MonitorEvent::OutageEnded { duration, at } => {
                info!(device = %self.id, duration_secs = duration.as_secs(), "outage ended");
                self.sink.record_outage_end(self.id, *duration, *at)
            }
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, MonitorState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, MonitorState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
