use crate::monitor::{DeviceSnapshot, Monitor};
use std::sync::{Arc, RwLock};

/// Every monitor running in this process. Monitors are never removed.
#[derive(Default)]
pub struct DeviceRegistry {
    monitors: RwLock<Vec<Arc<Monitor>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, monitor: Arc<Monitor>) {
        self.monitors
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(monitor);
    }

    /// Copies each monitor's state, one read lock at a time.
    pub fn snapshot(&self) -> Vec<DeviceSnapshot> {
        let monitors: Vec<Arc<Monitor>> = self
            .monitors
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        monitors.iter().map(|monitor| monitor.snapshot()).collect()
    }

    pub fn len(&self) -> usize {
        self.monitors
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
