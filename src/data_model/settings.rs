use crate::config::{DeviceId, Target};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use url::Url;

/// Validated command-line settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub device_id: Option<DeviceId>,
    pub targets: Vec<Target>,
    pub interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub slow_threshold_ms: u64,
    pub debounce_ticks: u32,
    /// `None` when running ephemeral.
    pub db_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub listen: SocketAddr,
    pub push_interval_ms: u64,
    pub webhook: Option<Url>,
    pub simulate_outage: bool,
}
