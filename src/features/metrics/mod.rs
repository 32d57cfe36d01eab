pub mod aggregate;

use crate::probe::{ProbeError, ProbeRound};
use std::time::Duration;

pub use aggregate::RunningMean;

/// Failures needed to call a round down: a strict majority of the targets.
pub fn down_threshold(target_count: usize) -> usize {
    target_count / 2 + 1
}

/// Single verdict derived from one probe round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundSummary {
    pub targets: usize,
    pub failures: usize,
    pub average_latency: Duration,
    pub down: bool,
    pub first_error: Option<ProbeError>,
}

impl RoundSummary {
    pub fn from_round(round: &ProbeRound) -> Self {
        let targets = round.len();
        let failures = round.failures();
        let elapsed: Vec<Duration> = round.samples.iter().map(|s| s.elapsed).collect();
        let first_error = round.samples.iter().find_map(|s| s.error().cloned());

        Self {
            targets,
            failures,
            average_latency: aggregate::mean_duration(&elapsed),
            down: targets > 0 && failures >= down_threshold(targets),
            first_error,
        }
    }

    pub fn is_slow(&self, threshold: Duration) -> bool {
        self.average_latency > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Target;
    use crate::probe::{ProbeErrorKind, ProbeResult, ProbeSample};
    use chrono::Utc;

    fn sample(ok: bool, elapsed_ms: u64) -> ProbeSample {
        ProbeSample {
            ts: Utc::now(),
            target: Target::new("192.0.2.1", 53),
            result: if ok {
                ProbeResult::Ok
            } else {
                ProbeResult::Err(ProbeError {
                    kind: ProbeErrorKind::ConnectTimeout,
                    message: "timed out".to_string(),
                })
            },
            elapsed: Duration::from_millis(elapsed_ms),
            attempts: if ok { 1 } else { 2 },
        }
    }

    #[test]
    fn down_threshold_is_strict_majority() {
        assert_eq!(down_threshold(1), 1);
        assert_eq!(down_threshold(2), 2);
        assert_eq!(down_threshold(3), 2);
        assert_eq!(down_threshold(4), 3);
        assert_eq!(down_threshold(5), 3);
    }

    #[test]
    fn three_of_four_failures_is_down() {
        let round = ProbeRound::new(vec![
            sample(false, 100),
            sample(false, 100),
            sample(false, 100),
            sample(true, 20),
        ]);
        let summary = RoundSummary::from_round(&round);
        assert!(summary.down);
        assert_eq!(summary.failures, 3);
        assert_eq!(
            summary.first_error.map(|e| e.kind),
            Some(ProbeErrorKind::ConnectTimeout)
        );
    }

    #[test]
    fn half_failing_is_still_up() {
        let round = ProbeRound::new(vec![
            sample(false, 10),
            sample(false, 10),
            sample(true, 10),
            sample(true, 10),
        ]);
        assert!(!RoundSummary::from_round(&round).down);
    }

    #[test]
    fn average_latency_counts_failed_probes() {
        let round = ProbeRound::new(vec![sample(true, 100), sample(false, 300)]);
        let summary = RoundSummary::from_round(&round);
        assert_eq!(summary.average_latency, Duration::from_millis(200));
        assert!(summary.is_slow(Duration::from_millis(150)));
        assert!(!summary.is_slow(Duration::from_millis(200)));
    }

    #[test]
    fn empty_round_is_not_down() {
        let summary = RoundSummary::from_round(&ProbeRound::default());
        assert!(!summary.down);
        assert_eq!(summary.average_latency, Duration::ZERO);
    }
}
