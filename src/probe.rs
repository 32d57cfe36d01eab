use crate::config::Target;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Outcome of probing one target once during a tick.
#[derive(Clone, Debug)]
pub struct ProbeSample {
    pub ts: DateTime<Utc>,
    pub target: Target,
    pub result: ProbeResult,
    /// Wall time spent on the probe, retry included.
    pub elapsed: Duration,
    pub attempts: u8,
}

impl ProbeSample {
    pub fn is_success(&self) -> bool {
        matches!(self.result, ProbeResult::Ok)
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match &self.result {
            ProbeResult::Ok => None,
            ProbeResult::Err(err) => Some(err),
        }
    }
}

#[derive(Clone, Debug)]
pub enum ProbeResult {
    Ok,
    Err(ProbeError),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ProbeErrorKind {
    DnsFailed,
    ConnectTimeout,
    ConnectFailed,
    IoError,
    Simulated,
}

impl ProbeErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProbeErrorKind::DnsFailed => "dns_failed",
            ProbeErrorKind::ConnectTimeout => "connect_timeout",
            ProbeErrorKind::ConnectFailed => "connect_failed",
            ProbeErrorKind::IoError => "io_error",
            ProbeErrorKind::Simulated => "simulated",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProbeError {
    pub kind: ProbeErrorKind,
    pub message: String,
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

/// All samples gathered during one tick, in target order.
#[derive(Clone, Debug, Default)]
pub struct ProbeRound {
    pub samples: Vec<ProbeSample>,
}

impl ProbeRound {
    pub fn new(samples: Vec<ProbeSample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.samples.iter().filter(|s| !s.is_success()).count()
    }
}
