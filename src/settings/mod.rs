use crate::common::net::{TargetParseError, parse_target, parse_webhook_url};
use crate::config::{
    AlertConfig, DeviceId, LiveViewConfig, MonitorConfig, StorageConfig, Target,
};
use crate::data_model::settings::AppSettings;
use crate::storage::default_db_path;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "linkpulse")]
#[command(about = "Internet reachability monitor with outage tracking and a live status feed", long_about = None)]
pub struct CliArgs {
    /// Target to probe as HOST[:PORT] (repeatable, port defaults to 53)
    #[arg(short, long, value_name = "HOST[:PORT]")]
    target: Vec<String>,

    /// Milliseconds between probe rounds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Per-attempt TCP connect timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    connect_timeout_ms: u64,

    /// Average round latency above which the link counts as slow
    #[arg(long, default_value_t = 3000)]
    slow_threshold_ms: u64,

    /// Consecutive failing rounds before an outage is declared
    #[arg(long, default_value_t = 3)]
    debounce: u32,

    /// SQLite database path
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Also append a human-readable event log to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Keep records in memory only
    #[arg(long, conflicts_with = "db")]
    ephemeral: bool,

    /// Live view listen address
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Milliseconds between live view pushes
    #[arg(long, default_value_t = 1000)]
    push_interval_ms: u64,

    /// POST a JSON alert here when an outage ends
    #[arg(long, value_name = "URL")]
    webhook: Option<String>,

    /// Device identifier (random when omitted)
    #[arg(long, value_name = "UUID")]
    device_id: Option<DeviceId>,

    /// Report every probe as failed without touching the network
    #[arg(long)]
    simulate_outage: bool,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("probe interval must be greater than zero")]
    ZeroInterval,
    #[error("connect timeout must be greater than zero")]
    ZeroConnectTimeout,
    #[error("debounce must be at least one round")]
    ZeroDebounce,
    #[error("live view push interval must be greater than zero")]
    ZeroPushInterval,
    #[error("no probe targets configured")]
    NoTargets,
    #[error("invalid target: {0}")]
    InvalidTarget(#[source] TargetParseError),
    #[error("invalid webhook: {0}")]
    InvalidWebhook(#[source] TargetParseError),
    #[error("no data directory available; pass --db or --ephemeral")]
    NoDataDir,
}

pub fn load_from_cli() -> Result<AppSettings, SettingsError> {
    let args = CliArgs::parse();
    from_args(args)
}

pub fn from_args(args: CliArgs) -> Result<AppSettings, SettingsError> {
    if args.interval_ms == 0 {
        return Err(SettingsError::ZeroInterval);
    }
    if args.connect_timeout_ms == 0 {
        return Err(SettingsError::ZeroConnectTimeout);
    }
    if args.debounce == 0 {
        return Err(SettingsError::ZeroDebounce);
    }
    if args.push_interval_ms == 0 {
        return Err(SettingsError::ZeroPushInterval);
    }

    let targets = if args.target.is_empty() {
        Target::defaults()
    } else {
        args.target
            .iter()
            .map(|raw| parse_target(raw))
            .collect::<Result<Vec<_>, _>>()
            .map_err(SettingsError::InvalidTarget)?
    };
    if targets.is_empty() {
        return Err(SettingsError::NoTargets);
    }

    let webhook = args
        .webhook
        .as_deref()
        .map(parse_webhook_url)
        .transpose()
        .map_err(SettingsError::InvalidWebhook)?;

    let db_path = if args.ephemeral {
        None
    } else {
        Some(args.db.or_else(default_db_path).ok_or(SettingsError::NoDataDir)?)
    };

    Ok(AppSettings {
        device_id: args.device_id,
        targets,
        interval_ms: args.interval_ms,
        connect_timeout_ms: args.connect_timeout_ms,
        slow_threshold_ms: args.slow_threshold_ms,
        debounce_ticks: args.debounce,
        db_path,
        log_file: args.log_file,
        listen: args.listen,
        push_interval_ms: args.push_interval_ms,
        webhook,
        simulate_outage: args.simulate_outage,
    })
}

pub fn apply_monitor(settings: &AppSettings, monitor: &mut MonitorConfig) {
    if let Some(device_id) = settings.device_id {
        monitor.device_id = device_id;
    }
    monitor.targets = settings.targets.clone();
    monitor.interval = Duration::from_millis(settings.interval_ms);
    monitor.connect_timeout = Duration::from_millis(settings.connect_timeout_ms);
    monitor.policy.debounce_ticks = settings.debounce_ticks;
    monitor.policy.slow_threshold = Duration::from_millis(settings.slow_threshold_ms);
}

pub fn storage_config(settings: &AppSettings) -> StorageConfig {
    StorageConfig {
        db_path: settings.db_path.clone(),
        log_file: settings.log_file.clone(),
    }
}

pub fn live_view_config(settings: &AppSettings) -> LiveViewConfig {
    LiveViewConfig {
        listen: settings.listen,
        push_interval: Duration::from_millis(settings.push_interval_ms),
    }
}

pub fn alert_config(settings: &AppSettings) -> AlertConfig {
    AlertConfig {
        webhook: settings.webhook.clone(),
        ..AlertConfig::default()
    }
}
