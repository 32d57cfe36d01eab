use crate::monitor::Monitor;
use crate::probe_engine::ProbeEngine;
use crossbeam_channel::{Receiver, Sender, select, tick};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub enum ControlMessage {
    Stop,
}

pub struct WorkerHandle {
    pub sender: Sender<ControlMessage>,
    pub join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Signals the worker and waits for the tick in flight to finish.
    pub fn stop(mut self) {
        let _ = self.sender.send(ControlMessage::Stop);
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            warn!("monitor worker panicked");
        }
    }
}

pub fn spawn_monitor_worker(monitor: Arc<Monitor>, engine: ProbeEngine) -> io::Result<WorkerHandle> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let name = format!("monitor-{}", monitor.id());
    let join = thread::Builder::new()
        .name(name)
        .spawn(move || run_worker(monitor, engine, rx))?;
    Ok(WorkerHandle {
        sender: tx,
        join: Some(join),
    })
}

fn run_worker(monitor: Arc<Monitor>, mut engine: ProbeEngine, control_rx: Receiver<ControlMessage>) {
    monitor.start();
    let ticker = tick(monitor.interval());

    loop {
        select! {
            recv(control_rx) -> msg => match msg {
                Ok(ControlMessage::Stop) | Err(_) => break,
            },
            recv(ticker) -> _ => {
                let round = engine.run();
                let events = monitor.observe(&round);
                debug!(device = %monitor.id(), failures = round.failures(), events = events.len(), "tick");
            }
        }
    }

    monitor.stop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::LogAlerter;
    use crate::config::{MonitorConfig, Target};
    use crate::monitor::ConnectionStatus;
    use crate::probe::{ProbeResult, ProbeSample};
    use crate::probe_engine::Prober;
    use crate::storage::MemorySink;
    use chrono::Utc;
    use std::time::{Duration, Instant};

    struct AlwaysUp;

    impl Prober for AlwaysUp {
        fn probe(&mut self, target: &Target) -> ProbeSample {
            ProbeSample {
                ts: Utc::now(),
                target: target.clone(),
                result: ProbeResult::Ok,
                elapsed: Duration::from_millis(1),
                attempts: 1,
            }
        }
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn worker_ticks_until_stopped() {
        let sink = Arc::new(MemorySink::new());
        let config = MonitorConfig {
            interval: Duration::from_millis(10),
            ..MonitorConfig::default()
        };
        let monitor = Arc::new(Monitor::new(&config, sink.clone(), Arc::new(LogAlerter)));
        let target = Target::new("192.0.2.1", 53);
        let engine = ProbeEngine::new(vec![(target, Box::new(AlwaysUp) as Box<dyn Prober>)]);

        let handle = spawn_monitor_worker(monitor.clone(), engine).expect("spawn");
        assert!(wait_for(|| sink.checks().len() >= 3));
        assert_eq!(monitor.status(), ConnectionStatus::Running);

        handle.stop();
        assert_eq!(monitor.status(), ConnectionStatus::Inactive);

        let settled = sink.checks().len();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sink.checks().len(), settled);
        assert_eq!(
            sink.status_changes().last().map(|change| change.to),
            Some(ConnectionStatus::Inactive)
        );
    }

    #[test]
    fn simulated_outage_opens_an_outage() {
        let sink = Arc::new(MemorySink::new());
        let config = MonitorConfig {
            interval: Duration::from_millis(10),
            ..MonitorConfig::default()
        };
        let monitor = Arc::new(Monitor::new(&config, sink.clone(), Arc::new(LogAlerter)));
        let engine = ProbeEngine::simulated_outage(&Target::defaults());

        let handle = spawn_monitor_worker(monitor.clone(), engine).expect("spawn");
        assert!(wait_for(|| !sink.outages().is_empty()));
        handle.stop();

        let outages = sink.outages();
        assert_eq!(outages.len(), 1);
        assert!(outages[0].is_open());
        assert!(sink.checks().len() >= 3);
    }
}
