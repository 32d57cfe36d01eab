mod snapshot;

pub use snapshot::{LiveSnapshot, LiveViewState, OutageWindows, build_snapshot};

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use std::future::Future;
use std::io;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

pub fn router(state: LiveViewState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/status", get(status_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Serves until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: LiveViewState, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "live view listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn current_snapshot(state: &LiveViewState) -> Option<LiveSnapshot> {
    let state = state.clone();
    match tokio::task::spawn_blocking(move || build_snapshot(&state)).await {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            warn!(error = %err, "snapshot task failed");
            None
        }
    }
}

async fn status_handler(State(state): State<LiveViewState>) -> Result<Json<LiveSnapshot>, StatusCode> {
    current_snapshot(&state)
        .await
        .map(Json)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<LiveViewState>) -> Response {
    ws.on_upgrade(move |socket| push_snapshots(socket, state))
}

/// Pushes a snapshot every interval until the client goes away.
async fn push_snapshots(socket: WebSocket, state: LiveViewState) {
    debug!("live view client connected");
    let (mut sender, mut receiver) = socket.split();
    let mut ticker = tokio::time::interval(state.push_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(snapshot) = current_snapshot(&state).await else {
                    continue;
                };
                let json = match serde_json::to_string(&snapshot) {
                    Ok(json) => json,
                    Err(err) => {
                        warn!(error = %err, "could not encode live snapshot");
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("live view client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::LogAlerter;
    use crate::common::time::SystemClock;
    use crate::config::MonitorConfig;
    use crate::monitor::Monitor;
    use crate::registry::DeviceRegistry;
    use crate::storage::MemorySink;
    use std::io::{Read, Write};
    use std::sync::Arc;
    use std::time::Duration;

    fn state() -> LiveViewState {
        let sink = Arc::new(MemorySink::new());
        let registry = Arc::new(DeviceRegistry::new());
        let monitor = Arc::new(Monitor::new(
            &MonitorConfig::default(),
            sink.clone(),
            Arc::new(LogAlerter),
        ));
        monitor.start();
        registry.register(monitor);
        LiveViewState {
            registry,
            sink,
            clock: Arc::new(SystemClock),
            push_interval: Duration::from_millis(50),
        }
    }

    fn get(addr: std::net::SocketAddr, path: &str) -> String {
        let mut stream = std::net::TcpStream::connect(addr).expect("connect");
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).expect("write");
        let mut response = String::new();
        stream.read_to_string(&mut response).expect("read");
        response
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn serves_health_and_status_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, state(), async move {
            let _ = shutdown_rx.await;
        }));

        let health = tokio::task::spawn_blocking(move || get(addr, "/healthz"))
            .await
            .expect("health");
        assert!(health.starts_with("HTTP/1.1 200"));
        assert!(health.ends_with("ok"));

        let status = tokio::task::spawn_blocking(move || get(addr, "/api/status"))
            .await
            .expect("status");
        assert!(status.starts_with("HTTP/1.1 200"));
        let (_, body) = status.split_once("\r\n\r\n").expect("body");
        let json: serde_json::Value = serde_json::from_str(body).expect("json");
        assert_eq!(json["devices"][0]["status"], "running");
        assert!(json["outages"]["day"].as_array().expect("day").is_empty());

        let _ = shutdown_tx.send(());
        server.await.expect("join").expect("serve");
    }
}
