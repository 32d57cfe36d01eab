use std::time::Duration;

/// Cumulative mean of per-tick latencies since the monitor started.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningMean {
    mean_ms: f64,
    count: u64,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Duration) {
        self.count += 1;
        let n = self.count as f64;
        let value = sample.as_secs_f64() * 1000.0;
        self.mean_ms = (self.mean_ms * (n - 1.0) + value) / n;
    }

    pub fn mean_ms(&self) -> f64 {
        self.mean_ms
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}
