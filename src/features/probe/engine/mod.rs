mod client;
mod fault;
mod helpers;

pub use client::ProbeClient;
pub use fault::SimulatedOutage;

use crate::config::Target;
use crate::probe::{ProbeError, ProbeErrorKind, ProbeResult, ProbeRound, ProbeSample};
use chrono::Utc;
use curl::Error as CurlError;
use std::thread;
use std::time::Duration;

/// Issues one reachability probe against a target.
pub trait Prober: Send {
    fn probe(&mut self, target: &Target) -> ProbeSample;
}

/// Runs one prober per target, all targets in parallel, once per call to [`ProbeEngine::run`].
pub struct ProbeEngine {
    lanes: Vec<(Target, Box<dyn Prober>)>,
}

impl ProbeEngine {
    pub fn new(lanes: Vec<(Target, Box<dyn Prober>)>) -> Self {
        Self { lanes }
    }

    pub fn connect(targets: &[Target], connect_timeout: Duration) -> Result<Self, CurlError> {
        let mut lanes: Vec<(Target, Box<dyn Prober>)> = Vec::with_capacity(targets.len());
        for target in targets {
            lanes.push((target.clone(), Box::new(ProbeClient::new(connect_timeout)?)));
        }
        Ok(Self::new(lanes))
    }

    pub fn simulated_outage(targets: &[Target]) -> Self {
        let lanes = targets
            .iter()
            .map(|target| (target.clone(), Box::new(SimulatedOutage) as Box<dyn Prober>))
            .collect();
        Self::new(lanes)
    }

    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.lanes.iter().map(|(target, _)| target)
    }

    pub fn run(&mut self) -> ProbeRound {
        let targets: Vec<Target> = self.lanes.iter().map(|(t, _)| t.clone()).collect();

        let samples = thread::scope(|scope| {
            let handles: Vec<_> = self
                .lanes
                .iter_mut()
                .map(|(target, prober)| {
                    let target = &*target;
                    scope.spawn(move || prober.probe(target))
                })
                .collect();

            handles
                .into_iter()
                .zip(targets)
                .map(|(handle, target)| {
                    handle.join().unwrap_or_else(|_| ProbeSample {
                        ts: Utc::now(),
                        target,
                        result: ProbeResult::Err(ProbeError {
                            kind: ProbeErrorKind::IoError,
                            message: "probe thread panicked".to_string(),
                        }),
                        elapsed: Duration::ZERO,
                        attempts: 0,
                    })
                })
                .collect()
        });

        ProbeRound::new(samples)
    }
}
