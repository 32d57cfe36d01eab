use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

pub type DeviceId = Uuid;

pub const DEFAULT_TARGETS: [&str; 4] = ["8.8.8.8", "1.1.1.1", "208.67.222.222", "8.8.4.4"];
pub const DEFAULT_PROBE_PORT: u16 = 53;

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub device_id: DeviceId,
    pub interval: Duration,
    pub connect_timeout: Duration,
    pub targets: Vec<Target>,
    pub policy: DecisionPolicy,
}

/// Thresholds that turn one probe round into a status decision.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DecisionPolicy {
    /// Consecutive failing ticks before an outage is declared.
    pub debounce_ticks: u32,
    /// Average round latency above which a reachable link counts as slow.
    pub slow_threshold: Duration,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// `None` keeps every record in memory only.
    pub db_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LiveViewConfig {
    pub listen: SocketAddr,
    pub push_interval: Duration,
}

#[derive(Clone, Debug)]
pub struct AlertConfig {
    pub webhook: Option<Url>,
    pub webhook_timeout: Duration,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn defaults() -> Vec<Target> {
        DEFAULT_TARGETS
            .iter()
            .map(|host| Target::new(*host, DEFAULT_PROBE_PORT))
            .collect()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            debounce_ticks: 3,
            slow_threshold: Duration::from_secs(3),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device_id: Uuid::new_v4(),
            interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(2),
            targets: Target::defaults(),
            policy: DecisionPolicy::default(),
        }
    }
}

impl Default for LiveViewConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            push_interval: Duration::from_secs(1),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook: None,
            webhook_timeout: Duration::from_secs(5),
        }
    }
}

/// History ranges summarised by the live view.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HistoryWindow {
    Day,
    Week,
    Month,
}

impl HistoryWindow {
    pub const ALL: [HistoryWindow; 3] = [HistoryWindow::Day, HistoryWindow::Week, HistoryWindow::Month];

    pub fn duration(self) -> Duration {
        match self {
            HistoryWindow::Day => Duration::from_secs(24 * 60 * 60),
            HistoryWindow::Week => Duration::from_secs(7 * 24 * 60 * 60),
            HistoryWindow::Month => Duration::from_secs(31 * 24 * 60 * 60),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HistoryWindow::Day => "1d",
            HistoryWindow::Week => "1w",
            HistoryWindow::Month => "1mo",
        }
    }
}

impl fmt::Display for HistoryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
