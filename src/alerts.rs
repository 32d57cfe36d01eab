use crate::config::AlertConfig;
use curl::easy::{Easy, List};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const ALERT_TITLE: &str = "Wifi Down";

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("webhook request failed: {0}")]
    Curl(#[from] curl::Error),
    #[error("webhook answered with HTTP {0}")]
    Status(u32),
    #[error("could not encode alert payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Receives outage-ended notifications.
///
/// Delivery problems stay inside the implementation; callers are never told.
pub trait Alerter: Send + Sync {
    fn notify_outage_ended(&self, duration: Duration);
}

pub fn outage_message(duration: Duration) -> String {
    format!("You have had an outage that lasted {} seconds", duration.as_secs())
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogAlerter;

impl Alerter for LogAlerter {
    fn notify_outage_ended(&self, duration: Duration) {
        warn!(
            title = ALERT_TITLE,
            duration_secs = duration.as_secs(),
            "{}",
            outage_message(duration)
        );
    }
}

/// POSTs a JSON notification on a detached thread.
#[derive(Clone, Debug)]
pub struct WebhookAlerter {
    url: Url,
    timeout: Duration,
}

impl WebhookAlerter {
    pub fn new(url: Url, timeout: Duration) -> Self {
        Self { url, timeout }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn payload(duration: Duration) -> Result<Vec<u8>, AlertError> {
        let payload = serde_json::json!({
            "title": ALERT_TITLE,
            "message": outage_message(duration),
            "duration_secs": duration.as_secs(),
        });
        Ok(serde_json::to_vec(&payload)?)
    }

    fn post(url: &Url, timeout: Duration, body: &[u8]) -> Result<(), AlertError> {
        let mut easy = Easy::new();
        easy.signal(false)?;
        easy.url(url.as_str())?;
        easy.timeout(timeout)?;
        easy.post(true)?;
        easy.post_fields_copy(body)?;

        let mut headers = List::new();
        headers.append("Content-Type: application/json")?;
        easy.http_headers(headers)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| Ok(data.len()))?;
            transfer.perform()?;
        }

        match easy.response_code()? {
            code if (200..300).contains(&code) => Ok(()),
            code => Err(AlertError::Status(code)),
        }
    }

    fn deliver(&self, duration: Duration) -> Result<(), AlertError> {
        let body = Self::payload(duration)?;
        Self::post(&self.url, self.timeout, &body)
    }
}

impl Alerter for WebhookAlerter {
    fn notify_outage_ended(&self, duration: Duration) {
        let alerter = self.clone();
        let spawned = thread::Builder::new()
            .name("linkpulse-webhook".to_string())
            .spawn(move || match alerter.deliver(duration) {
                Ok(()) => debug!(url = %alerter.url, "outage alert delivered"),
                Err(err) => warn!(url = %alerter.url, error = %err, "outage alert delivery failed"),
            });
        if let Err(err) = spawned {
            warn!(error = %err, "could not start alert thread");
        }
    }
}

#[derive(Default)]
pub struct MultiAlerter {
    alerters: Vec<Arc<dyn Alerter>>,
}

impl MultiAlerter {
    pub fn new(alerters: Vec<Arc<dyn Alerter>>) -> Self {
        Self { alerters }
    }

    pub fn len(&self) -> usize {
        self.alerters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerters.is_empty()
    }
}

impl Alerter for MultiAlerter {
    fn notify_outage_ended(&self, duration: Duration) {
        for alerter in &self.alerters {
            alerter.notify_outage_ended(duration);
        }
    }
}

/// Log alerts always; webhook alerts when a URL is configured.
pub fn from_config(config: &AlertConfig) -> MultiAlerter {
    let mut alerters: Vec<Arc<dyn Alerter>> = vec![Arc::new(LogAlerter)];
    if let Some(url) = &config.webhook {
        alerters.push(Arc::new(WebhookAlerter::new(url.clone(), config.webhook_timeout)));
    }
    MultiAlerter::new(alerters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Counting {
        seen: Mutex<Vec<Duration>>,
    }

    impl Alerter for Counting {
        fn notify_outage_ended(&self, duration: Duration) {
            self.seen.lock().expect("seen").push(duration);
        }
    }

    /// Accepts one request, answers with `status`, returns the raw request.
    fn one_shot_server(status: &'static str) -> (Url, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = stream.read(&mut buf).expect("read");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            let response = format!("HTTP/1.1 {status}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
            stream.write_all(response.as_bytes()).expect("write");
            String::from_utf8_lossy(&request).into_owned()
        });
        let url = Url::parse(&format!("http://127.0.0.1:{port}/hook")).expect("url");
        (url, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        body.len() >= length
    }

    #[test]
    fn outage_message_reports_whole_seconds() {
        assert_eq!(
            outage_message(Duration::from_millis(42_900)),
            "You have had an outage that lasted 42 seconds"
        );
    }

    #[test]
    fn multi_alerter_notifies_every_alerter() {
        let first = Arc::new(Counting::default());
        let second = Arc::new(Counting::default());
        let multi = MultiAlerter::new(vec![first.clone(), second.clone()]);
        multi.notify_outage_ended(Duration::from_secs(5));

        assert_eq!(*first.seen.lock().expect("seen"), vec![Duration::from_secs(5)]);
        assert_eq!(*second.seen.lock().expect("seen"), vec![Duration::from_secs(5)]);
    }

    #[test]
    fn from_config_adds_webhook_only_when_configured() {
        assert_eq!(from_config(&AlertConfig::default()).len(), 1);

        let config = AlertConfig {
            webhook: Some(Url::parse("http://127.0.0.1:9/hook").expect("url")),
            ..AlertConfig::default()
        };
        assert_eq!(from_config(&config).len(), 2);
    }

    #[test]
    fn webhook_posts_json_payload() {
        let (url, server) = one_shot_server("200 OK");
        let alerter = WebhookAlerter::new(url, Duration::from_secs(5));
        alerter.deliver(Duration::from_secs(12)).expect("delivered");

        let request = server.join().expect("server");
        assert!(request.starts_with("POST /hook"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        let (_, body) = request.split_once("\r\n\r\n").expect("body");
        let json: serde_json::Value = serde_json::from_str(body).expect("json");
        assert_eq!(json["title"], ALERT_TITLE);
        assert_eq!(json["duration_secs"], 12);
        assert_eq!(json["message"], "You have had an outage that lasted 12 seconds");
    }

    #[test]
    fn webhook_reports_non_success_status() {
        let (url, server) = one_shot_server("500 Internal Server Error");
        let alerter = WebhookAlerter::new(url, Duration::from_secs(5));
        let err = alerter.deliver(Duration::from_secs(1)).expect_err("status");
        assert!(matches!(err, AlertError::Status(500)));
        server.join().expect("server");
    }

    #[test]
    fn webhook_reports_unreachable_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let url = Url::parse(&format!("http://127.0.0.1:{port}/hook")).expect("url");
        let alerter = WebhookAlerter::new(url, Duration::from_secs(2));
        let err = alerter.deliver(Duration::from_secs(1)).expect_err("refused");
        assert!(matches!(err, AlertError::Curl(_)));
    }
}
