use super::Prober;
use crate::config::Target;
use crate::probe::{ProbeError, ProbeErrorKind, ProbeResult, ProbeSample};
use chrono::Utc;
use std::time::Duration;

/// Prober that reports every target as unreachable without touching the network.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimulatedOutage;

impl Prober for SimulatedOutage {
    fn probe(&mut self, target: &Target) -> ProbeSample {
        ProbeSample {
            ts: Utc::now(),
            target: target.clone(),
            result: ProbeResult::Err(ProbeError {
                kind: ProbeErrorKind::Simulated,
                message: "simulated outage".to_string(),
            }),
            elapsed: Duration::ZERO,
            attempts: 1,
        }
    }
}
