use anyhow::{Context, Result};
use linkpulse::config::MonitorConfig;
use linkpulse::liveview::{self, LiveViewState};
use linkpulse::monitor::Monitor;
use linkpulse::probe_engine::ProbeEngine;
use linkpulse::registry::DeviceRegistry;
use linkpulse::settings::{
    alert_config, apply_monitor, live_view_config, load_from_cli, storage_config,
};
use linkpulse::{SystemClock, alerts, logging, runtime, storage};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{info, warn};

const SERVER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    logging::init().context("failed to install log subscriber")?;
    let settings = load_from_cli()?;

    let mut monitor_config = MonitorConfig::default();
    apply_monitor(&settings, &mut monitor_config);
    let live_view = live_view_config(&settings);

    let sink = storage::open(&storage_config(&settings)).context("failed to open storage")?;
    let alerter = Arc::new(alerts::from_config(&alert_config(&settings)));

    let registry = Arc::new(DeviceRegistry::new());
    let monitor = Arc::new(Monitor::new(&monitor_config, sink.clone(), alerter));
    registry.register(monitor.clone());

    let engine = if settings.simulate_outage {
        warn!("simulated outage enabled: every probe will fail");
        ProbeEngine::simulated_outage(&monitor_config.targets)
    } else {
        ProbeEngine::connect(&monitor_config.targets, monitor_config.connect_timeout)
            .context("failed to initialise probe client")?
    };

    let listener = TcpListener::bind(live_view.listen)
        .await
        .with_context(|| format!("failed to bind live view on {}", live_view.listen))?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let state = LiveViewState {
        registry: registry.clone(),
        sink,
        clock: Arc::new(SystemClock),
        push_interval: live_view.push_interval,
    };
    let server = tokio::spawn(liveview::serve(listener, state, async move {
        let _ = shutdown_rx.await;
    }));

    info!(
        device = %monitor.id(),
        targets = monitor_config.targets.len(),
        interval_ms = monitor_config.interval.as_millis() as u64,
        "starting connectivity monitor"
    );
    let worker = runtime::spawn_monitor_worker(monitor, engine)
        .context("failed to spawn monitor worker")?;

    wait_for_shutdown().await;
    info!("shutdown signal received");

    if tokio::task::spawn_blocking(move || worker.stop()).await.is_err() {
        warn!("monitor worker did not stop cleanly");
    }

    let _ = shutdown_tx.send(());
    match tokio::time::timeout(SERVER_DRAIN_TIMEOUT, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(err))) => warn!(error = %err, "live view server failed"),
        Ok(Err(err)) => warn!(error = %err, "live view task failed"),
        Err(_) => warn!("live view did not drain in time"),
    }

    info!(devices = registry.len(), "stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut terminate = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable, waiting for Ctrl-C only");
                let _ = signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}
