use super::status::ConnectionStatus;
use crate::common::time::elapsed_between;
use crate::config::DecisionPolicy;
use crate::features::metrics::{RoundSummary, RunningMean};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Error recorded with every failed connectivity check.
pub const CONNECTION_DOWN: &str = "connection is down";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OpenOutage {
    pub started_at: DateTime<Utc>,
}

/// Something the state machine wants persisted or announced, in emission order.
#[derive(Clone, Debug, PartialEq)]
pub enum MonitorEvent {
    Check {
        success: bool,
        latency: Duration,
        at: DateTime<Utc>,
        error: Option<String>,
    },
    StatusChange {
        from: ConnectionStatus,
        to: ConnectionStatus,
        at: DateTime<Utc>,
    },
    OutageStarted {
        at: DateTime<Utc>,
    },
    OutageEnded {
        duration: Duration,
        at: DateTime<Utc>,
    },
}

/// Everything a monitor mutates per tick. Transitions are pure; callers do the I/O.
#[derive(Clone, Debug)]
pub struct MonitorState {
    running: bool,
    status: ConnectionStatus,
    latency: RunningMean,
    consecutive_failures: u32,
    open_outage: Option<OpenOutage>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorState {
    pub fn new() -> Self {
        Self {
            running: false,
            status: ConnectionStatus::Inactive,
            latency: RunningMean::new(),
            consecutive_failures: 0,
            open_outage: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn average_latency_ms(&self) -> f64 {
        self.latency.mean_ms()
    }

    pub fn ticks(&self) -> u64 {
        self.latency.count()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn open_outage(&self) -> Option<OpenOutage> {
        self.open_outage
    }

    pub fn start(&mut self, at: DateTime<Utc>) -> Vec<MonitorEvent> {
        if self.running {
            return Vec::new();
        }
        self.running = true;
        self.transition(ConnectionStatus::Running, at)
            .into_iter()
            .collect()
    }

    /// Goes inactive. An open outage stays open.
    pub fn stop(&mut self, at: DateTime<Utc>) -> Vec<MonitorEvent> {
        self.running = false;
        self.transition(ConnectionStatus::Inactive, at)
            .into_iter()
            .collect()
    }

    pub fn apply(
        &mut self,
        summary: &RoundSummary,
        policy: &DecisionPolicy,
        now: DateTime<Utc>,
    ) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        let latency = summary.average_latency;
        self.latency.push(latency);

        if summary.down {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            events.push(MonitorEvent::Check {
                success: false,
                latency,
                at: now,
                error: Some(CONNECTION_DOWN.to_string()),
            });

            if self.consecutive_failures >= policy.debounce_ticks && self.open_outage.is_none() {
                self.open_outage = Some(OpenOutage { started_at: now });
                events.extend(self.transition(ConnectionStatus::Down, now));
                events.push(MonitorEvent::OutageStarted { at: now });
            }
        } else {
            self.consecutive_failures = 0;
            if let Some(outage) = self.open_outage.take() {
                events.push(MonitorEvent::OutageEnded {
                    duration: elapsed_between(outage.started_at, now),
                    at: now,
                });
            }

            events.push(MonitorEvent::Check {
                success: true,
                latency,
                at: now,
                error: None,
            });

            let next = if summary.is_slow(policy.slow_threshold) {
                ConnectionStatus::Slow
            } else {
                ConnectionStatus::Running
            };
            events.extend(self.transition(next, now));
        }

        events
    }

    fn transition(&mut self, to: ConnectionStatus, at: DateTime<Utc>) -> Option<MonitorEvent> {
        if self.status == to {
            return None;
        }
        let from = self.status;
        self.status = to;
        Some(MonitorEvent::StatusChange { from, to, at })
    }
}
